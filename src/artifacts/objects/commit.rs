//! Git commit object
//!
//! ## Format
//!
//! ```text
//! tree <tree-sha>
//! parent <parent-sha>
//! author <name> <email> <timestamp> <timezone>
//! committer <name> <email> <timestamp> <timezone>
//!
//! <commit message>
//! ```
//!
//! The message is stored verbatim: no trimming, no trailing newline added.

use crate::artifacts::objects::object::{Object, Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use bytes::Bytes;
use derive_new::new;

/// Who made a change: the name and email half of an author line
#[derive(Debug, Clone, Eq, PartialEq, Hash, new)]
pub struct Identity {
    #[new(into)]
    pub name: String,
    #[new(into)]
    pub email: String,
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// Author or committer information: identity plus timestamp with timezone
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Author {
    identity: Identity,
    timestamp: chrono::DateTime<chrono::FixedOffset>,
}

impl Author {
    /// Create a new author stamped with the current local time
    pub fn new(identity: Identity) -> Self {
        Author {
            identity,
            timestamp: chrono::Local::now().fixed_offset(),
        }
    }

    pub fn new_with_timestamp(
        identity: Identity,
        timestamp: chrono::DateTime<chrono::FixedOffset>,
    ) -> Self {
        Author {
            identity,
            timestamp,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn timestamp(&self) -> chrono::DateTime<chrono::FixedOffset> {
        self.timestamp
    }

    /// Format complete author info as `Name <email> timestamp timezone`
    pub fn display(&self) -> String {
        format!(
            "{} {} {}",
            self.identity,
            self.timestamp.timestamp(),
            self.timestamp.format("%z")
        )
    }
}

impl TryFrom<&str> for Author {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        // Split from the right: timezone and timestamp never contain spaces
        let parts: Vec<&str> = value.rsplitn(3, ' ').collect();
        if parts.len() < 3 {
            anyhow::bail!("Invalid author format");
        }

        let timezone = parts[0];
        let timestamp = parts[1]
            .parse::<i64>()
            .map_err(|_| anyhow::anyhow!("Invalid timestamp"))?;
        let name_email_part = parts[2];

        let email_start = name_email_part
            .find('<')
            .context("Invalid author format: missing '<'")?;
        let email_end = name_email_part
            .rfind('>')
            .context("Invalid author format: missing '>'")?;
        if email_end < email_start {
            anyhow::bail!("Invalid author format: misplaced '>'");
        }

        let name = name_email_part[..email_start].trim().to_string();
        let email = name_email_part[email_start + 1..email_end].to_string();

        let offset = parse_offset(timezone)?;
        let datetime = chrono::DateTime::from_timestamp(timestamp, 0)
            .context("Invalid timestamp")?
            .with_timezone(&offset);

        Ok(Author::new_with_timestamp(Identity::new(name, email), datetime))
    }
}

/// Parse a `+HHMM` / `-HHMM` timezone offset
fn parse_offset(timezone: &str) -> anyhow::Result<chrono::FixedOffset> {
    let invalid = || anyhow::anyhow!("Invalid timezone: {timezone}");
    if timezone.len() != 5 || !timezone.is_ascii() {
        return Err(invalid());
    }

    let (sign, digits) = timezone.split_at(1);
    let hours = digits[..2].parse::<i32>().map_err(|_| invalid())?;
    let minutes = digits[2..].parse::<i32>().map_err(|_| invalid())?;
    let seconds = hours * 3600 + minutes * 60;

    match sign {
        "+" => chrono::FixedOffset::east_opt(seconds),
        "-" => chrono::FixedOffset::west_opt(seconds),
        _ => None,
    }
    .ok_or_else(invalid)
}

/// Git commit object
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Commit {
    /// Parent commit IDs (empty for initial commit, multiple for merge commits)
    parents: Vec<ObjectId>,
    tree_oid: ObjectId,
    author: Author,
    committer: Author,
    message: String,
}

impl Commit {
    /// Create a new commit; the author also acts as committer
    pub fn new(parents: Vec<ObjectId>, tree_oid: ObjectId, author: Author, message: String) -> Self {
        Commit {
            parents,
            tree_oid,
            committer: author.clone(),
            author,
            message,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn tree_oid(&self) -> &ObjectId {
        &self.tree_oid
    }

    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn committer(&self) -> &Author {
        &self.committer
    }

    pub fn display(&self) -> String {
        let mut lines = vec![];

        lines.push(format!("tree {}", self.tree_oid));
        for parent in &self.parents {
            lines.push(format!("parent {parent}"));
        }
        lines.push(format!("author {}", self.author.display()));
        lines.push(format!("committer {}", self.committer.display()));
        lines.push(String::new());
        lines.push(self.message.to_string());

        lines.join("\n")
    }
}

impl Packable for Commit {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        Ok(Bytes::from(self.display()))
    }
}

impl Unpackable for Commit {
    fn deserialize(content: &[u8]) -> anyhow::Result<Self> {
        let content = std::str::from_utf8(content)?;
        let (headers, message) = content
            .split_once("\n\n")
            .context("Invalid commit object: missing message separator")?;
        let mut lines = headers.lines();

        let tree_oid = lines
            .next()
            .and_then(|line| line.strip_prefix("tree "))
            .context("Invalid commit object: invalid tree line")?;
        let tree_oid = ObjectId::try_parse(tree_oid.to_string())?;

        let mut parents = Vec::new();
        let mut next_line = lines
            .next()
            .context("Invalid commit object: missing author line")?;
        while let Some(parent_oid) = next_line.strip_prefix("parent ") {
            parents.push(ObjectId::try_parse(parent_oid.to_string())?);
            next_line = lines
                .next()
                .context("Invalid commit object: missing author line")?;
        }

        let author = next_line
            .strip_prefix("author ")
            .context("Invalid commit object: invalid author line")?;
        let author = Author::try_from(author)?;

        let committer = lines
            .next()
            .and_then(|line| line.strip_prefix("committer "))
            .context("Invalid commit object: invalid committer line")?;
        let committer = Author::try_from(committer)?;

        Ok(Commit {
            parents,
            tree_oid,
            author,
            committer,
            message: message.to_string(),
        })
    }
}

impl Object for Commit {
    fn object_type(&self) -> ObjectType {
        ObjectType::Commit
    }
}
