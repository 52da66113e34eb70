use derive_new::new;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Eq, PartialEq, new)]
pub struct FileSpec {
    /// Path relative to the repository root, `/`-separated
    pub path: String,
    pub content: String,
}

impl FileSpec {
    /// The `--add PATH=FILE` argument staging this file under its own path
    pub fn add_arg(&self) -> String {
        format!("--add={}={}", self.path, self.path)
    }
}

pub fn write_file(root: &Path, file_spec: &FileSpec) -> PathBuf {
    let path = root.join(&file_spec.path);
    // make sure the parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .unwrap_or_else(|e| panic!("Failed to create directory {:?}: {}", parent, e));
    }

    std::fs::write(&path, &file_spec.content)
        .unwrap_or_else(|e| panic!("Failed to write file {:?}: {}", path, e));

    path
}

/// Random files spread over up to `dirs_count` directories, plus some at the root
pub fn write_generated_files(root: &Path, dirs_count: usize) -> Vec<FileSpec> {
    use fake::{
        Fake,
        faker::lorem::en::{Word, Words},
    };

    let mut dirs = vec![String::new()];
    for _ in 0..dirs_count {
        dirs.push(format!("dir_{}/", Word().fake::<String>()));
    }

    let mut files: Vec<FileSpec> = Vec::new();
    for dir in dirs {
        let files_count = (1..=4).fake::<usize>();
        for _ in 0..files_count {
            let path = format!("{dir}{}.txt", Word().fake::<String>());
            if files.iter().any(|file| file.path == path) {
                continue;
            }

            let content = Words(5..10).fake::<Vec<String>>().join(" ");
            let file_spec = FileSpec::new(path, content);
            write_file(root, &file_spec);
            files.push(file_spec);
        }
    }

    files
}
