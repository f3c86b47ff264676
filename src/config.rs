//! Job configuration.
//!
//! Every field has a default matching the Topelius archive layout, so a TOML
//! file is only needed to override paths or collection tables. Collection
//! directories are relative to `svn_root`; stored paths are relative to it
//! too, with `/` separators.

use crate::disambiguate::TitleComparison;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// How a collection's publications are tied to reading-text files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStrategy {
    /// Fuzzy match of the publication name against file stems.
    Title,
    /// Exact match of the letter signum against the stem suffix.
    Signum,
    /// Lookup list of file names stored in per-year folders
    /// (year = first four characters of the file name).
    YearFolderList,
    /// Lookup list of file names stored directly in the collection folder.
    FolderList,
    /// Lookup list of full stored paths.
    PathList,
}

impl PathStrategy {
    pub fn is_list(self) -> bool {
        matches!(
            self,
            PathStrategy::YearFolderList | PathStrategy::FolderList | PathStrategy::PathList
        )
    }
}

/// A legacy collection and its reading-text directory.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PublicationSource {
    pub legacy_id: i64,
    pub dir: String,
    pub strategy: PathStrategy,
    /// Lookup list file in `csv_dir`, for list strategies.
    #[serde(default)]
    pub list: Option<String>,
}

/// A legacy collection and its general-comment directory.
/// Collections without one get the template path.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CommentSource {
    pub legacy_id: i64,
    #[serde(default)]
    pub dir: Option<String>,
}

/// A legacy collection and a directory of files belonging to it.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CollectionDir {
    pub legacy_id: i64,
    pub dir: String,
}

/// A legacy collection and its version directory.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct VersionSource {
    pub legacy_id: i64,
    pub dir: String,
    #[serde(default)]
    pub title_comparison: TitleComparison,
    /// Suffix of this collection's log file names, e.g. "lfb".
    #[serde(default)]
    pub log_suffix: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub project_name: String,
    pub project_id: i64,

    pub legacy_db: Option<PathBuf>,
    pub target_db: Option<PathBuf>,
    pub notes_db: Option<PathBuf>,

    /// Checkout of the legacy document repository.
    pub svn_root: PathBuf,
    pub id_dir: PathBuf,
    pub log_dir: PathBuf,
    pub csv_dir: PathBuf,
    pub toc_dir: PathBuf,
    /// Local copy of the already migrated web XML files.
    pub web_root: PathBuf,

    pub comment_template: String,

    /// The eight Läsning för barn part files.
    pub lfb_source_dir: PathBuf,
    pub lfb_split_dir: PathBuf,
    /// The single Läsning för barn comment XML file.
    pub lfb_comment_source: PathBuf,
    pub lfb_comment_split_dir: PathBuf,
    /// Notes-store documents of the eight unsplit part files.
    pub lfb_note_document_ids: Vec<i64>,

    pub oai_endpoint: String,

    pub publications: Vec<PublicationSource>,
    pub comments: Vec<CommentSource>,
    pub manuscripts: Vec<CollectionDir>,
    pub versions: Vec<VersionSource>,
}

const TRUNK: &str = "documents/trunk";
const COMMENTS: &str = "documents/Redaktionella_texter/Kommentarer";
const MANUSCRIPTS: &str = "documents/Manuskript";

fn publication(legacy_id: i64, folder: &str, strategy: PathStrategy, list: Option<&str>) -> PublicationSource {
    PublicationSource {
        legacy_id,
        dir: format!("{TRUNK}/{folder}"),
        strategy,
        list: list.map(str::to_string),
    }
}

fn default_publications() -> Vec<PublicationSource> {
    use PathStrategy::*;
    let titled = [
        (1, "Ljungblommor"),
        (2, "Nya_blad_och_Ljung"),
        (4, "Noveller"),
        (5, "Hertiginnan_af_Finland_och_andra_historiska_noveller"),
        (7, "Vinterqvallar"),
        (12, "Finland_framstalldt_i_teckningar"),
        (16, "Ovrig_lyrik"),
        (18, "Noveller_och_kortprosa"),
        (24, "Academica"),
    ];
    let titled_after_letters = [
        (6, "Faltskarns_berattelser"),
        (8, "Planeternas_skyddslingar"),
        (10, "Naturens_bok_och_Boken_om_vart_land"),
        (13, "En_resa_i_Finland"),
        (17, "Dramatik"),
        (19, "Ovrig_barnlitteratur"),
    ];

    let mut sources: Vec<PublicationSource> = titled
        .iter()
        .map(|(id, folder)| publication(*id, folder, Title, None))
        .collect();
    sources.push(publication(30, "Brev/Forlagskorrespondens", Signum, None));
    sources.extend(
        titled_after_letters
            .iter()
            .map(|(id, folder)| publication(*id, folder, Title, None)),
    );
    sources.push(publication(
        20,
        "Forelasningar",
        FolderList,
        Some(crate::lookup::FORELASNINGAR_FILES),
    ));
    sources.push(publication(22, "Finland_i_19de_seklet", Title, None));
    sources.push(publication(
        23,
        "Publicistik",
        YearFolderList,
        Some(crate::lookup::PUBLICISTIK_FILES),
    ));
    sources.push(publication(26, "Religiosa_skrifter_och_psalmer", Title, None));
    sources.push(publication(29, "Dagbocker", Title, None));
    sources.push(publication(31, "Brev/Foraldrakorrespondens", Signum, None));
    sources.push(publication(
        32,
        "Lasning_for_barn",
        PathList,
        Some(crate::lookup::LFB_FILES),
    ));
    sources
}

fn default_comments() -> Vec<CommentSource> {
    let with_dir = [
        (1, "Ljungblommor"),
        (2, "Nya_blad_och_Ljung"),
        (4, "Noveller"),
        (5, "Hertiginnan_af_Finland_och_andra_historiska_noveller"),
        (7, "Vinterqvallar"),
        (12, "Finland_framstalldt_i_teckningar"),
        (16, "Ovrig_lyrik"),
        (18, "Noveller_och_kortprosa"),
        (24, "Academica"),
        (30, "Brev/Forlagskorrespondens"),
    ];
    let template_only = [6, 8, 10, 13, 20, 22, 23, 29, 31];

    with_dir
        .iter()
        .map(|(id, folder)| CommentSource {
            legacy_id: *id,
            dir: Some(format!("{COMMENTS}/{folder}")),
        })
        .chain(template_only.iter().map(|id| CommentSource {
            legacy_id: *id,
            dir: None,
        }))
        .collect()
}

fn default_manuscripts() -> Vec<CollectionDir> {
    [
        (1, format!("{MANUSCRIPTS}/Ljungblommor_manuskript")),
        (2, format!("{MANUSCRIPTS}/Nya_blad_och_Ljung_manuskript")),
        (16, format!("{TRUNK}/Ovrig_lyrik")),
        (24, format!("{TRUNK}/Academica/Otryckta Academica texter")),
        (30, format!("{TRUNK}/Brev/Forlagskorrespondens")),
        (17, format!("{TRUNK}/Dramatik")),
        (19, format!("{MANUSCRIPTS}/Ovrig_barnlitteratur_manuskript")),
        (20, format!("{TRUNK}/Forelasningar")),
        (29, format!("{TRUNK}/Dagbocker")),
        (31, format!("{TRUNK}/Brev/Foraldrakorrespondens")),
        (32, format!("{MANUSCRIPTS}/Lasning_for_barn_manuskript")),
    ]
    .into_iter()
    .map(|(legacy_id, dir)| CollectionDir { legacy_id, dir })
    .collect()
}

fn default_versions() -> Vec<VersionSource> {
    vec![VersionSource {
        legacy_id: 32,
        dir: "documents/Varianter/Lasning_for_barn_varianter".to_string(),
        title_comparison: TitleComparison::Contains,
        log_suffix: Some("lfb".to_string()),
    }]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_name: "topelius".to_string(),
            project_id: 10,
            legacy_db: None,
            target_db: None,
            notes_db: None,
            svn_root: PathBuf::from("../../Topelius SVN"),
            id_dir: PathBuf::from("id_dictionaries"),
            log_dir: PathBuf::from("logs"),
            csv_dir: PathBuf::from("csv"),
            toc_dir: PathBuf::from("toc_files"),
            web_root: PathBuf::from("var"),
            comment_template: "templates/comment.xml".to_string(),
            lfb_source_dir: PathBuf::from("Lasning_for_barn"),
            lfb_split_dir: PathBuf::from("Lfb_split_files"),
            lfb_comment_source: PathBuf::from("Lasning_for_barn_kommentarer.xml"),
            lfb_comment_split_dir: PathBuf::from("Lfb_split_comments"),
            lfb_note_document_ids: (4395..=4402).collect(),
            oai_endpoint: "https://digi.kansalliskirjasto.fi/interfaces/OAI-PMH".to_string(),
            publications: default_publications(),
            comments: default_comments(),
            manuscripts: default_manuscripts(),
            versions: default_versions(),
        }
    }
}

impl Config {
    /// Load from a TOML file, or use the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// Absolute location of a directory stored relative to the checkout.
    pub fn svn_path(&self, relative: &str) -> PathBuf {
        self.svn_root.join(relative)
    }

    pub fn csv_path(&self, name: &str) -> PathBuf {
        self.csv_dir.join(name)
    }
}
