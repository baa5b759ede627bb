//! ComicInfo.xml sidecar parsing.
//!
//! Three generations of the ComicInfo schema are in the wild (1.0, 2.0 and
//! 2.1). They share most tags, so a document is matched structurally: each
//! schema is deserialized in turn, newest first, and the first one that
//! deserializes wins. Every schema folds into the same
//! [`ComicMetadataRecord`], which is then mapped onto [`BookInfo`].

use crate::book::{BookInfo, dedup_preserving_order, split_comma_delimited};
use crate::error::{BookError, Result};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use std::fmt::Display;
use std::str::FromStr;

/// Base file name of the sidecar inside a comic archive.
pub const COMIC_INFO_FILENAME: &str = "ComicInfo.xml";

/// Check whether an archive entry is the sidecar, at any depth and in any case.
pub fn is_comic_info(entry_name: &str) -> bool {
    let base = entry_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(entry_name);
    base.eq_ignore_ascii_case(COMIC_INFO_FILENAME)
}

/// Union of the fields of every ComicInfo schema version.
///
/// Fields mirror the XML element names.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComicMetadataRecord {
    pub title: Option<String>,
    pub series: Option<String>,
    pub number: Option<String>,
    pub summary: Option<String>,
    pub year: Option<i32>,
    pub month: Option<i32>,
    pub day: Option<i32>,
    pub writer: Option<String>,
    pub penciller: Option<String>,
    pub inker: Option<String>,
    pub colorist: Option<String>,
    pub letterer: Option<String>,
    pub editor: Option<String>,
    pub translator: Option<String>,
    pub publisher: Option<String>,
    pub language_iso: Option<String>,
    pub genre: Option<String>,
    pub tags: Option<String>,
    pub characters: Option<String>,
    pub teams: Option<String>,
    pub locations: Option<String>,
    pub page_count: Option<i32>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn positive(value: Option<i32>) -> Option<i32> {
    value.filter(|v| *v > 0)
}

/// Concatenate comma-delimited fields, dropping blanks and duplicates.
fn collect_names(fields: &[&Option<String>]) -> Vec<String> {
    let names = fields
        .iter()
        .filter_map(|field| non_empty(field))
        .flat_map(split_comma_delimited)
        .collect();
    dedup_preserving_order(names)
}

impl ComicMetadataRecord {
    /// Issue number, when it is a positive integer.
    fn issue_number(&self) -> Option<u64> {
        non_empty(&self.number)
            .and_then(|n| n.parse::<u64>().ok())
            .filter(|n| *n > 0)
    }

    /// Publication date as `YYYY`, `YYYY-MM` or `YYYY-MM-DD`.
    fn published_date(&self) -> Option<String> {
        let year = positive(self.year)?;
        let mut date = year.to_string();
        if let Some(month) = positive(self.month) {
            date.push_str(&format!("-{month:02}"));
            if let Some(day) = positive(self.day) {
                date.push_str(&format!("-{day:02}"));
            }
        }
        Some(date)
    }

    /// Fold the record into a [`BookInfo`]. The title is left empty when the
    /// sidecar names neither a title nor a series.
    pub fn into_book_info(self) -> BookInfo {
        let number = self.issue_number();
        let series = non_empty(&self.series).map(String::from);

        let title = match (non_empty(&self.title), &series, number) {
            (Some(title), _, _) => title.to_string(),
            (None, Some(series), Some(number)) => format!("{series} #{number}"),
            (None, Some(series), None) => series.clone(),
            (None, None, _) => String::new(),
        };

        let authors = collect_names(&[
            &self.writer,
            &self.penciller,
            &self.inker,
            &self.colorist,
            &self.letterer,
            &self.editor,
            &self.translator,
        ]);

        let keywords = collect_names(&[
            &self.genre,
            &self.tags,
            &self.characters,
            &self.teams,
            &self.locations,
        ]);

        BookInfo {
            title,
            subtitle: Vec::new(),
            language: non_empty(&self.language_iso)
                .map(|lang| vec![lang.to_string()])
                .unwrap_or_default(),
            description: non_empty(&self.summary).map(String::from),
            series,
            series_index: number.map(|n| n.to_string()),
            pages: positive(self.page_count).map_or(0, |p| p as u32),
            authors,
            publisher: non_empty(&self.publisher).map(String::from),
            published_date: self.published_date(),
            keywords,
        }
    }
}

/// Text of an element that may be repeated; the last occurrence wins.
fn last_text<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    let mut values: Vec<String> = Vec::deserialize(d)?;
    Ok(values.pop())
}

/// Numeric element; blank means absent, anything unparseable fails the schema.
fn optional_number<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw = last_text(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(de::Error::custom),
    }
}

/// Enumerated element restricted to `allowed` values.
fn restricted<'de, D>(
    deserializer: D,
    allowed: &[&str],
) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = last_text(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) if allowed.contains(&value) => Ok(Some(value.to_string())),
        Some(value) => Err(de::Error::custom(format!("unexpected value {value:?}"))),
    }
}

fn yes_no<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    restricted(d, &["Unknown", "No", "Yes"])
}

fn manga_v2<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    restricted(d, &["Unknown", "No", "Yes", "YesAndRightToLeft"])
}

/// Community rating, a decimal between 0 and 5.
fn rating<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<f32>, D::Error> {
    match optional_number::<D, f32>(d)? {
        Some(value) if !(0.0..=5.0).contains(&value) => {
            Err(de::Error::custom(format!("rating {value} out of range")))
        }
        other => Ok(other),
    }
}

/// ComicInfo 1.0.
#[allow(dead_code)] // some fields are only validated
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct ComicInfoV1 {
    #[serde(deserialize_with = "last_text")]
    title: Option<String>,
    #[serde(deserialize_with = "last_text")]
    series: Option<String>,
    #[serde(deserialize_with = "last_text")]
    number: Option<String>,
    #[serde(deserialize_with = "optional_number")]
    count: Option<i32>,
    #[serde(deserialize_with = "optional_number")]
    volume: Option<i32>,
    #[serde(deserialize_with = "last_text")]
    summary: Option<String>,
    #[serde(deserialize_with = "optional_number")]
    year: Option<i32>,
    #[serde(deserialize_with = "optional_number")]
    month: Option<i32>,
    #[serde(deserialize_with = "last_text")]
    writer: Option<String>,
    #[serde(deserialize_with = "last_text")]
    penciller: Option<String>,
    #[serde(deserialize_with = "last_text")]
    inker: Option<String>,
    #[serde(deserialize_with = "last_text")]
    colorist: Option<String>,
    #[serde(deserialize_with = "last_text")]
    letterer: Option<String>,
    #[serde(deserialize_with = "last_text")]
    editor: Option<String>,
    #[serde(deserialize_with = "last_text")]
    publisher: Option<String>,
    #[serde(deserialize_with = "last_text")]
    genre: Option<String>,
    #[serde(deserialize_with = "optional_number")]
    page_count: Option<i32>,
    #[serde(rename = "LanguageISO", deserialize_with = "last_text")]
    language_iso: Option<String>,
    #[serde(deserialize_with = "yes_no")]
    black_and_white: Option<String>,
    #[serde(deserialize_with = "yes_no")]
    manga: Option<String>,
}

/// ComicInfo 2.0.
#[allow(dead_code)] // some fields are only validated
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct ComicInfoV2 {
    #[serde(deserialize_with = "last_text")]
    title: Option<String>,
    #[serde(deserialize_with = "last_text")]
    series: Option<String>,
    #[serde(deserialize_with = "last_text")]
    number: Option<String>,
    #[serde(deserialize_with = "optional_number")]
    count: Option<i32>,
    #[serde(deserialize_with = "optional_number")]
    volume: Option<i32>,
    #[serde(deserialize_with = "last_text")]
    summary: Option<String>,
    #[serde(deserialize_with = "optional_number")]
    year: Option<i32>,
    #[serde(deserialize_with = "optional_number")]
    month: Option<i32>,
    #[serde(deserialize_with = "optional_number")]
    day: Option<i32>,
    #[serde(deserialize_with = "last_text")]
    writer: Option<String>,
    #[serde(deserialize_with = "last_text")]
    penciller: Option<String>,
    #[serde(deserialize_with = "last_text")]
    inker: Option<String>,
    #[serde(deserialize_with = "last_text")]
    colorist: Option<String>,
    #[serde(deserialize_with = "last_text")]
    letterer: Option<String>,
    #[serde(deserialize_with = "last_text")]
    editor: Option<String>,
    #[serde(deserialize_with = "last_text")]
    publisher: Option<String>,
    #[serde(deserialize_with = "last_text")]
    genre: Option<String>,
    #[serde(deserialize_with = "optional_number")]
    page_count: Option<i32>,
    #[serde(rename = "LanguageISO", deserialize_with = "last_text")]
    language_iso: Option<String>,
    #[serde(deserialize_with = "yes_no")]
    black_and_white: Option<String>,
    #[serde(deserialize_with = "manga_v2")]
    manga: Option<String>,
    #[serde(deserialize_with = "last_text")]
    characters: Option<String>,
    #[serde(deserialize_with = "last_text")]
    teams: Option<String>,
    #[serde(deserialize_with = "last_text")]
    locations: Option<String>,
    #[serde(deserialize_with = "rating")]
    community_rating: Option<f32>,
}

/// ComicInfo 2.1 (draft).
#[allow(dead_code)] // some fields are only validated
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct ComicInfoV21 {
    #[serde(deserialize_with = "last_text")]
    title: Option<String>,
    #[serde(deserialize_with = "last_text")]
    series: Option<String>,
    #[serde(deserialize_with = "last_text")]
    number: Option<String>,
    #[serde(deserialize_with = "optional_number")]
    count: Option<i32>,
    #[serde(deserialize_with = "optional_number")]
    volume: Option<i32>,
    #[serde(deserialize_with = "last_text")]
    summary: Option<String>,
    #[serde(deserialize_with = "optional_number")]
    year: Option<i32>,
    #[serde(deserialize_with = "optional_number")]
    month: Option<i32>,
    #[serde(deserialize_with = "optional_number")]
    day: Option<i32>,
    #[serde(deserialize_with = "last_text")]
    writer: Option<String>,
    #[serde(deserialize_with = "last_text")]
    penciller: Option<String>,
    #[serde(deserialize_with = "last_text")]
    inker: Option<String>,
    #[serde(deserialize_with = "last_text")]
    colorist: Option<String>,
    #[serde(deserialize_with = "last_text")]
    letterer: Option<String>,
    #[serde(deserialize_with = "last_text")]
    editor: Option<String>,
    #[serde(deserialize_with = "last_text")]
    translator: Option<String>,
    #[serde(deserialize_with = "last_text")]
    publisher: Option<String>,
    #[serde(deserialize_with = "last_text")]
    genre: Option<String>,
    #[serde(deserialize_with = "last_text")]
    tags: Option<String>,
    #[serde(deserialize_with = "optional_number")]
    page_count: Option<i32>,
    #[serde(rename = "LanguageISO", deserialize_with = "last_text")]
    language_iso: Option<String>,
    #[serde(deserialize_with = "yes_no")]
    black_and_white: Option<String>,
    #[serde(deserialize_with = "manga_v2")]
    manga: Option<String>,
    #[serde(deserialize_with = "last_text")]
    characters: Option<String>,
    #[serde(deserialize_with = "last_text")]
    teams: Option<String>,
    #[serde(deserialize_with = "last_text")]
    locations: Option<String>,
    #[serde(deserialize_with = "rating")]
    community_rating: Option<f32>,
}

/// A ComicInfo schema generation that folds into the common record.
trait ComicInfoSchema: DeserializeOwned {
    /// Schema version label, for logging.
    const VERSION: &'static str;

    fn into_record(self) -> ComicMetadataRecord;
}

impl ComicInfoSchema for ComicInfoV1 {
    const VERSION: &'static str = "1.0";

    fn into_record(self) -> ComicMetadataRecord {
        ComicMetadataRecord {
            title: self.title,
            series: self.series,
            number: self.number,
            summary: self.summary,
            year: self.year,
            month: self.month,
            writer: self.writer,
            penciller: self.penciller,
            inker: self.inker,
            colorist: self.colorist,
            letterer: self.letterer,
            editor: self.editor,
            publisher: self.publisher,
            language_iso: self.language_iso,
            genre: self.genre,
            page_count: self.page_count,
            ..ComicMetadataRecord::default()
        }
    }
}

impl ComicInfoSchema for ComicInfoV2 {
    const VERSION: &'static str = "2.0";

    fn into_record(self) -> ComicMetadataRecord {
        ComicMetadataRecord {
            title: self.title,
            series: self.series,
            number: self.number,
            summary: self.summary,
            year: self.year,
            month: self.month,
            day: self.day,
            writer: self.writer,
            penciller: self.penciller,
            inker: self.inker,
            colorist: self.colorist,
            letterer: self.letterer,
            editor: self.editor,
            publisher: self.publisher,
            language_iso: self.language_iso,
            genre: self.genre,
            characters: self.characters,
            teams: self.teams,
            locations: self.locations,
            page_count: self.page_count,
            ..ComicMetadataRecord::default()
        }
    }
}

impl ComicInfoSchema for ComicInfoV21 {
    const VERSION: &'static str = "2.1";

    fn into_record(self) -> ComicMetadataRecord {
        ComicMetadataRecord {
            title: self.title,
            series: self.series,
            number: self.number,
            summary: self.summary,
            year: self.year,
            month: self.month,
            day: self.day,
            writer: self.writer,
            penciller: self.penciller,
            inker: self.inker,
            colorist: self.colorist,
            letterer: self.letterer,
            editor: self.editor,
            translator: self.translator,
            publisher: self.publisher,
            language_iso: self.language_iso,
            genre: self.genre,
            tags: self.tags,
            characters: self.characters,
            teams: self.teams,
            locations: self.locations,
            page_count: self.page_count,
        }
    }
}

type SchemaParser = fn(&str) -> std::result::Result<ComicMetadataRecord, quick_xml::DeError>;

fn parse_as<S: ComicInfoSchema>(
    xml: &str,
) -> std::result::Result<ComicMetadataRecord, quick_xml::DeError> {
    quick_xml::de::from_str::<S>(xml).map(S::into_record)
}

/// Schema descriptors in the order they are tried.
const SCHEMAS: [(&str, SchemaParser); 3] = [
    (ComicInfoV21::VERSION, parse_as::<ComicInfoV21>),
    (ComicInfoV2::VERSION, parse_as::<ComicInfoV2>),
    (ComicInfoV1::VERSION, parse_as::<ComicInfoV1>),
];

/// Parse the raw sidecar into the intermediate record.
pub fn parse_record(xml: &[u8]) -> Result<ComicMetadataRecord> {
    let text = String::from_utf8_lossy(xml);
    let text = text.trim_start_matches('\u{feff}');

    let mut errors = Vec::with_capacity(SCHEMAS.len());
    for (version, parse) in SCHEMAS {
        match parse(text) {
            Ok(record) => {
                tracing::debug!(version, "Parsed ComicInfo.xml");
                return Ok(record);
            }
            Err(e) => errors.push(format!("v{version}: {e}")),
        }
    }

    Err(BookError::MetadataParse(errors.join("; ")))
}

/// Parse a ComicInfo.xml document into a [`BookInfo`].
pub fn parse_comic_info(xml: &[u8]) -> Result<BookInfo> {
    parse_record(xml).map(ComicMetadataRecord::into_book_info)
}
