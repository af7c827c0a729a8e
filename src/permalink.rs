//! Permalink encoding: board state as JSON, then standard base64.

use crate::error::PermalinkError;
use crate::locator::DatasetLocator;
use crate::sort::{SortDirection, SortSpec};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};

/// The serializable projection of a board.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermalinkState {
    #[serde(default, alias = "aggregateChecked")]
    pub aggregate: bool,
    /// `(token, color index)` pairs in insertion order.
    #[serde(default)]
    pub highlights: Vec<(String, usize)>,
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
}

/// One column of a link. Links written by the web board store
/// `{className, scaling, mode, customHeader, sort}`; those decode to the
/// `<class>/<scaling>/<mode>/<class>.csv` locator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ColumnWire")]
pub struct ColumnConfig {
    pub segments: Vec<String>,
    pub file: String,
    pub label: String,
    pub sort: Option<SortSpec>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColumnWire {
    Located {
        segments: Vec<String>,
        file: String,
        #[serde(default, alias = "customHeader")]
        label: String,
        #[serde(default, deserialize_with = "lenient_sort")]
        sort: Option<SortSpec>,
    },
    #[serde(rename_all = "camelCase")]
    Classed {
        class_name: String,
        scaling: String,
        mode: String,
        #[serde(default)]
        custom_header: String,
        #[serde(default, deserialize_with = "lenient_sort")]
        sort: Option<SortSpec>,
    },
}

impl From<ColumnWire> for ColumnConfig {
    fn from(wire: ColumnWire) -> Self {
        match wire {
            ColumnWire::Located {
                segments,
                file,
                label,
                sort,
            } => Self {
                segments,
                file,
                label,
                sort,
            },
            ColumnWire::Classed {
                class_name,
                scaling,
                mode,
                custom_header,
                sort,
            } => Self {
                file: format!("{}.csv", class_name),
                segments: vec![class_name, scaling, mode],
                label: custom_header,
                sort,
            },
        }
    }
}

/// `null`, `{}` and a sort without a field all mean "no saved sort". A missing
/// order sorts descending, as the web board's comparator does.
fn lenient_sort<'de, D>(deserializer: D) -> Result<Option<SortSpec>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct PartialSort {
        by: Option<usize>,
        order: Option<SortDirection>,
    }

    let partial = Option::<PartialSort>::deserialize(deserializer)?;
    Ok(partial.and_then(|p| {
        Some(SortSpec {
            field: p.by?,
            direction: p.order.unwrap_or(SortDirection::Desc),
        })
    }))
}

impl ColumnConfig {
    pub fn new(locator: &DatasetLocator, label: impl Into<String>, sort: Option<SortSpec>) -> Self {
        Self {
            segments: locator.segments.clone(),
            file: locator.file.clone(),
            label: label.into(),
            sort,
        }
    }

    pub fn locator(&self) -> DatasetLocator {
        DatasetLocator::new(self.segments.iter().cloned(), self.file.clone())
    }
}

/// Encode `state`, leaving out columns whose locator is incomplete.
pub fn encode(state: &PermalinkState) -> String {
    let projected = PermalinkState {
        aggregate: state.aggregate,
        highlights: state.highlights.clone(),
        columns: state
            .columns
            .iter()
            .filter(|c| c.locator().is_complete())
            .cloned()
            .collect(),
    };
    let json = serde_json::to_string(&projected)
        .expect("permalink state holds only strings, integers and bools");
    STANDARD.encode(json)
}

/// Decode a fragment (with or without its leading `#`).
///
/// All or nothing: an incomplete column or a color outside `0..palette_size` rejects
/// the whole fragment.
pub fn decode(fragment: &str, palette_size: usize) -> Result<PermalinkState, PermalinkError> {
    let fragment = fragment.trim();
    let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
    let bytes = STANDARD.decode(fragment)?;
    let state: PermalinkState = serde_json::from_slice(&bytes)?;

    if let Some(index) = state
        .columns
        .iter()
        .position(|c| !c.locator().is_complete())
    {
        return Err(PermalinkError::IncompleteColumn { index });
    }
    if let Some((token, color)) = state
        .highlights
        .iter()
        .find(|(_, color)| *color >= palette_size)
    {
        return Err(PermalinkError::ColorOutOfRange {
            token: token.clone(),
            color: *color,
            palette_size,
        });
    }
    Ok(state)
}
