use std::{
    fs,
    path::{Path, PathBuf},
    thread,
};

use anyhow::{anyhow, bail, Context};
use clap::{command, value_parser, Arg, ArgAction};
use log::{error, info};

use resolver::{HttpResolver, MediaResolver};

mod convert;
mod metadata;
mod parser;
mod resolver;
mod rewrite;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let matches = command!()
        .args([
            Arg::new("article_dir")
                .help("Directory with Pelican article files")
                .value_parser(value_parser!(PathBuf))
                .default_value("posts"),
            Arg::new("author")
                .long("author")
                .help("Default author for articles without an Author header")
                .default_value("marvin"),
            Arg::new("giphy_key")
                .long("giphy-key")
                .help("GIPHY API key (falls back to the GIPHY_API_KEY environment variable)"),
            Arg::new("write")
                .long("write")
                .action(ArgAction::SetTrue)
                .help("Overwrite each article in place instead of printing to stdout"),
        ])
        .get_matches();

    let article_dir: &PathBuf = matches.get_one("article_dir").unwrap();
    if !article_dir.exists() || !article_dir.is_dir() {
        bail!("article_dir must be a directory.");
    }
    let default_author: &String = matches.get_one("author").unwrap();
    let giphy_key = matches
        .get_one::<String>("giphy_key")
        .cloned()
        .or_else(|| std::env::var("GIPHY_API_KEY").ok());
    let write_back = matches.get_flag("write");

    let articles = article_files(article_dir)?;
    let resolver = HttpResolver::new(giphy_key);

    // one task per article; all results are collected at the join barrier so
    // a failed article cannot stop the others
    let results: Vec<(PathBuf, anyhow::Result<String>)> = thread::scope(|scope| {
        let handles: Vec<_> = articles
            .iter()
            .map(|path| {
                let resolver = &resolver;
                scope.spawn(move || {
                    info!("work on {path:?}");
                    convert_file(path, default_author, resolver)
                })
            })
            .collect();
        articles
            .iter()
            .cloned()
            .zip(handles.into_iter().map(joined))
            .collect()
    });

    let total = results.len();
    let mut failed = 0;
    for (path, result) in results {
        match result {
            Ok(converted) if write_back => {
                fs::write(&path, converted).with_context(|| format!("while writing {path:?}"))?;
                info!("wrote {path:?}");
            }
            Ok(converted) => print!("{converted}"),
            Err(e) => {
                failed += 1;
                error!("{path:?}: {e:#}");
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {total} articles failed");
    }
    Ok(())
}

// A panicking task counts as that article's failure, not a process abort.
fn joined<T>(handle: thread::ScopedJoinHandle<'_, anyhow::Result<T>>) -> anyhow::Result<T> {
    handle
        .join()
        .unwrap_or_else(|_| Err(anyhow!("conversion task panicked")))
}

fn convert_file(
    path: &Path,
    default_author: &str,
    resolver: &dyn MediaResolver,
) -> anyhow::Result<String> {
    let raw = fs::read_to_string(path).with_context(|| format!("while reading {path:?}"))?;
    convert::convert(&raw, default_author, resolver)
        .with_context(|| format!("while converting {path:?}"))
}

// Non-recursive listing of markdown files, sorted by name.
fn article_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = vec![];
    for entry in fs::read_dir(dir).with_context(|| format!("while listing {dir:?}"))? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "md") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_files_lists_only_markdown_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.md", "a.md", "notes.txt"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        fs::create_dir(dir.path().join("nested.md")).unwrap();

        let files = article_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.md", "b.md"]);
    }

    #[test]
    fn panicking_task_becomes_an_error_result() {
        let result: anyhow::Result<String> = thread::scope(|scope| {
            let handle = scope.spawn(|| panic!("boom"));
            joined(handle)
        });
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("conversion task panicked"));
    }
}
