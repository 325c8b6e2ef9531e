use anyhow::Result;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use crate::database_ops::source::{DelimitedReader, SourceFormat};

pub type SourceReader = DelimitedReader<BufReader<File>>;

/// The IMDB dataset dumps the loader knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFile {
    NameBasics,
    TitleBasics,
    TitleAkas,
    TitlePrincipals,
    TitleCrew,
    TitleEpisode,
    TitleRatings,
}

impl SourceFile {
    pub const ALL: [SourceFile; 7] = [
        SourceFile::NameBasics,
        SourceFile::TitleBasics,
        SourceFile::TitleAkas,
        SourceFile::TitlePrincipals,
        SourceFile::TitleCrew,
        SourceFile::TitleEpisode,
        SourceFile::TitleRatings,
    ];

    pub const fn file_name(self) -> &'static str {
        match self {
            SourceFile::NameBasics => "name.basics.tsv",
            SourceFile::TitleBasics => "title.basics.tsv",
            SourceFile::TitleAkas => "title.akas.tsv",
            SourceFile::TitlePrincipals => "title.principals.tsv",
            SourceFile::TitleCrew => "title.crew.tsv",
            SourceFile::TitleEpisode => "title.episode.tsv",
            SourceFile::TitleRatings => "title.ratings.tsv",
        }
    }
}

/// Directory holding the uncompressed dumps.
#[derive(Debug, Clone)]
pub struct SourceDir {
    root: PathBuf,
}

impl SourceDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, file: SourceFile) -> PathBuf {
        self.root.join(file.file_name())
    }

    pub fn open(&self, file: SourceFile) -> Result<SourceReader> {
        DelimitedReader::open(&self.path(file), SourceFormat::TSV)
    }
}
