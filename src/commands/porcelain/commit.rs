use crate::areas::config::author_date_from_env;
use crate::areas::refs::DEFAULT_BRANCH;
use crate::areas::repository::Repository;
use crate::areas::stage::{CommitOutcome, CommitRequest};
use crate::areas::store::RefStore;
use crate::artifacts::objects::commit::Identity;
use crate::artifacts::objects::object_id::ObjectId;
use crate::commands::Changes;
use crate::errors::StageError;
use std::io::Write;

const HEADS_PREFIX: &str = "refs/heads/";

#[derive(Debug, Clone, Default)]
pub struct CommitOptions {
    pub message: String,
    /// Revision whose tree the changes apply to
    pub base: Option<String>,
    pub parents: Vec<String>,
    /// Ref to advance, `master` if unset
    pub ref_name: Option<String>,
    pub author: Option<Identity>,
    /// Skip the commit if the new tree equals this one
    pub last_tree: Option<String>,
    pub changes: Changes,
}

impl Repository {
    /// Commit `options.changes` and advance the ref
    ///
    /// Without `--base` or `--parent` the commit continues from the current
    /// tip of the ref, like `git commit`: the tip is both the base and the
    /// only parent, and an unchanged tree is not committed.
    pub fn commit(&mut self, options: &CommitOptions) -> anyhow::Result<()> {
        let ref_name = options
            .ref_name
            .clone()
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string());
        let follow_tip = options.base.is_none() && options.parents.is_empty();

        let (base, parents) = if follow_tip {
            let tip = self.refs().read_ref(&ref_name)?;
            (tip.as_ref().map(ToString::to_string), tip.into_iter().collect())
        } else {
            let parents = options
                .parents
                .iter()
                .map(|revision| self.resolve_revision(revision))
                .collect::<anyhow::Result<Vec<_>>>()?;
            (options.base.clone(), parents)
        };

        let mut stage = self.stage();
        if let Some(revision) = &base {
            stage.read_base(revision)?;
        }
        self.apply_changes(&mut stage, &options.changes)?;

        let last_tree = match &options.last_tree {
            Some(tree) => Some(ObjectId::try_parse(tree.clone())?),
            None if follow_tip => stage.base().map(|base| base.oid().clone()),
            None => None,
        };

        let is_root = parents.is_empty();
        let mut request = CommitRequest::new(options.message.clone())
            .parents(parents)
            .ref_name(ref_name.clone());
        if let Some(author) = &options.author {
            request = request.author(author.clone());
        }
        if let Some(timestamp) = author_date_from_env() {
            request = request.timestamp(timestamp);
        }
        if let Some(tree) = last_tree {
            request = request.last_tree(tree);
        }

        match stage.commit(request)? {
            CommitOutcome::Committed { commit, .. } => {
                let branch = ref_name.strip_prefix(HEADS_PREFIX).unwrap_or(&ref_name);
                let root = if is_root { "(root-commit) " } else { "" };
                let first_line = options.message.lines().next().unwrap_or_default();

                writeln!(
                    self.writer(),
                    "[{} {}{}] {}",
                    branch,
                    root,
                    commit.to_short_oid(),
                    first_line
                )?;
            }
            CommitOutcome::NoChanges { .. } => {
                writeln!(self.writer(), "nothing to commit")?;
            }
        }

        Ok(())
    }

    fn resolve_revision(&self, revision: &str) -> anyhow::Result<ObjectId> {
        if ObjectId::is_full_hex(revision) {
            return ObjectId::try_parse(revision.to_string());
        }

        Ok(self
            .refs()
            .read_ref(revision)?
            .ok_or_else(|| StageError::NotFound(format!("revision {revision}")))?)
    }
}
