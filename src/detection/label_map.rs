//! Text-format label maps (`*.pbtxt`, `StringIntLabelMap` messages) and the
//! category index built from them.
//!
//! ```text
//! item {
//!   name: "/m/01g317"
//!   id: 1
//!   display_name: "person"
//! }
//! ```

use crate::error::{Result, VisionError};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LabelMapItem {
    pub name: Option<String>,
    pub id: i32,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: i32,
    pub name: String,
}

pub type CategoryIndex = HashMap<i32, Category>;

mod protos {
    include!(concat!(env!("OUT_DIR"), "/label-map-protos/mod.rs"));
}

use protos::string_int_label_map::{StringIntLabelMap, StringIntLabelMapItem};

fn malformed(index: usize, reason: impl Into<String>) -> VisionError {
    VisionError::MalformedLabelMap {
        index,
        reason: reason.into(),
    }
}

fn to_item(index: usize, item: StringIntLabelMapItem) -> Result<LabelMapItem> {
    let id = item.id.ok_or_else(|| malformed(index, "item without id"))?;
    if id < 0 {
        return Err(malformed(index, format!("negative id {}", id)));
    }
    if id == 0 && item.name.as_deref() != Some("background") {
        return Err(malformed(index, "id 0 is reserved for the background class"));
    }
    Ok(LabelMapItem {
        name: item.name,
        id,
        display_name: item.display_name,
    })
}

/// Parse label map text. Ids must be non-negative and id 0 is reserved for
/// `background`.
pub fn parse_label_map(text: &str) -> Result<Vec<LabelMapItem>> {
    let map: StringIntLabelMap =
        protobuf::text_format::parse_from_str(text).map_err(|e| VisionError::LabelMapSyntax(e.to_string()))?;
    map.item
        .into_iter()
        .enumerate()
        .map(|(index, item)| to_item(index, item))
        .collect()
}

pub fn load_label_map<P: AsRef<Path>>(path: P) -> Result<Vec<LabelMapItem>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| VisionError::file(path, e))?;
    parse_label_map(&text)
}

/// Keep items with ids in `1..=max_num_classes`, first occurrence of an id
/// wins. With `use_display_name` the display name is preferred over the name.
pub fn convert_to_categories(items: &[LabelMapItem], max_num_classes: i32, use_display_name: bool) -> Vec<Category> {
    let mut categories: Vec<Category> = Vec::new();
    for item in items {
        if item.id < 1 || item.id > max_num_classes {
            log::info!("Ignore item {} since it falls outside of requested label range.", item.id);
            continue;
        }
        let display = if use_display_name {
            item.display_name.as_ref().or(item.name.as_ref())
        } else {
            item.name.as_ref()
        };
        let name = display.cloned().unwrap_or_else(|| format!("category_{}", item.id));
        if !categories.iter().any(|c| c.id == item.id) {
            categories.push(Category { id: item.id, name });
        }
    }
    categories
}

pub fn create_category_index(categories: &[Category]) -> CategoryIndex {
    categories.iter().map(|c| (c.id, c.clone())).collect()
}
