use anyhow::Result;
use bit_stage::areas::repository::Repository;
use bit_stage::artifacts::objects::commit::Identity;
use bit_stage::commands::porcelain::commit::CommitOptions;
use bit_stage::commands::{AddSpec, Changes};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "bit-stage",
    version = "0.1.0",
    author = "Sami Barbut-Dica",
    about = "Stage files and write git trees and commits",
    long_about = "Stages file contents under tree paths, optionally on top of an existing tree, \
    and writes git-compatible tree and commit objects without a working directory or index.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
",
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ChangeArgs {
    #[arg(long = "add", value_name = "PATH=FILE", help = "Stage the contents of FILE under PATH")]
    adds: Vec<AddSpec>,
    #[arg(long = "delete", value_name = "PATH", help = "Remove PATH from the base tree")]
    deletes: Vec<String>,
}

impl From<ChangeArgs> for Changes {
    fn from(args: ChangeArgs) -> Self {
        Changes {
            adds: args.adds,
            deletes: args.deletes,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "init",
        about = "Initialize a new repository",
        long_about = "This command initializes a new repository in the current directory or at the specified path."
    )]
    Init {
        #[arg(index = 1, help = "The path to the repository")]
        path: Option<String>,
    },
    #[command(
        name = "cat-file",
        about = "Print the content of an object",
        long_about = "This command prints the content of an object in the repository. \
        Trees are listed one entry per line."
    )]
    CatFile {
        #[arg(short = 'p', long, help = "The object SHA to print")]
        sha: String,
    },
    #[command(
        name = "hash-object",
        about = "Hash a file as a blob and optionally write it to the object database"
    )]
    HashObject {
        #[arg(short, long, required = false, help = "Write the object to the object database")]
        write: bool,
        #[arg(index = 1)]
        file: String,
    },
    #[command(
        name = "write-tree",
        about = "Write a tree from staged changes and print its SHA",
        long_about = "This command merges the given changes over an optional base revision \
        and writes the resulting trees to the object database."
    )]
    WriteTree {
        #[arg(long, help = "Revision whose tree the changes apply to")]
        base: Option<String>,
        #[command(flatten)]
        changes: ChangeArgs,
    },
    #[command(
        name = "commit",
        about = "Create a new commit with the specified message",
        long_about = "This command commits the given changes and advances a ref. \
        Without --base or --parent it continues from the current tip of the ref."
    )]
    Commit {
        #[arg(short, long, help = "The commit message")]
        message: String,
        #[arg(long, help = "Revision whose tree the changes apply to")]
        base: Option<String>,
        #[arg(long = "parent", help = "Parent commit, repeatable")]
        parents: Vec<String>,
        #[arg(long = "ref", help = "Ref to advance (default: master)")]
        ref_name: Option<String>,
        #[arg(long, requires = "author_email", help = "Author name")]
        author_name: Option<String>,
        #[arg(long, requires = "author_name", help = "Author email")]
        author_email: Option<String>,
        #[arg(long, help = "Skip the commit if the new tree equals this tree")]
        last_tree: Option<String>,
        #[command(flatten)]
        changes: ChangeArgs,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let pwd = std::env::current_dir()?;

    match cli.command {
        Commands::Init { path } => {
            let mut repository = match path {
                Some(path) => Repository::new(&path, Box::new(std::io::stdout()))?,
                None => Repository::new(&pwd.to_string_lossy(), Box::new(std::io::stdout()))?,
            };

            repository.init()?
        }
        Commands::CatFile { sha } => {
            let mut repository =
                Repository::new(&pwd.to_string_lossy(), Box::new(std::io::stdout()))?;

            repository.cat_file(&sha)?
        }
        Commands::HashObject { write, file } => {
            let mut repository =
                Repository::new(&pwd.to_string_lossy(), Box::new(std::io::stdout()))?;

            repository.hash_object(&file, write)?
        }
        Commands::WriteTree { base, changes } => {
            let mut repository =
                Repository::new(&pwd.to_string_lossy(), Box::new(std::io::stdout()))?;

            repository.write_tree(base.as_deref(), &changes.into())?
        }
        Commands::Commit {
            message,
            base,
            parents,
            ref_name,
            author_name,
            author_email,
            last_tree,
            changes,
        } => {
            let mut repository =
                Repository::new(&pwd.to_string_lossy(), Box::new(std::io::stdout()))?;

            let options = CommitOptions {
                message,
                base,
                parents,
                ref_name,
                author: author_name.zip(author_email).map(|(name, email)| Identity::new(name, email)),
                last_tree,
                changes: changes.into(),
            };
            repository.commit(&options)?
        }
    }

    Ok(())
}
