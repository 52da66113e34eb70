use crate::areas::config::{ChainedIdentity, EnvIdentity, RepoConfig};
use crate::areas::database::Database;
use crate::areas::refs::Refs;
use crate::areas::stage::Stage;
use std::cell::{RefCell, RefMut};
use std::path::Path;

/// A `.git` directory on disk plus the output stream commands report to
pub struct Repository {
    path: Box<Path>,
    writer: RefCell<Box<dyn std::io::Write>>,
    database: Database,
    refs: Refs,
}

impl Repository {
    pub fn new(path: &str, writer: Box<dyn std::io::Write>) -> anyhow::Result<Self> {
        let path = Path::new(path);
        if !path.exists() {
            std::fs::create_dir_all(path)?;
        }
        let path = path.canonicalize()?;

        let database = Database::new(path.join(".git").join("objects").into_boxed_path());
        let refs = Refs::new(path.join(".git").into_boxed_path());

        Ok(Repository {
            path: path.into_boxed_path(),
            writer: RefCell::new(writer),
            database,
            refs,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn git_path(&self) -> Box<Path> {
        self.path.join(".git").into_boxed_path()
    }

    pub fn writer(&'_ self) -> RefMut<'_, Box<dyn std::io::Write>> {
        self.writer.borrow_mut()
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    /// Author lookup: environment first, then `.git/config`
    pub fn identity_resolver(&self) -> ChainedIdentity {
        ChainedIdentity::new()
            .then(EnvIdentity)
            .then(RepoConfig::new(self.git_path().join("config").into_boxed_path()))
    }

    /// A fresh staging session over this repository's stores
    pub fn stage(&self) -> Stage<&Database, &Refs> {
        Stage::new(&self.database, &self.refs).with_identity_resolver(self.identity_resolver())
    }
}
