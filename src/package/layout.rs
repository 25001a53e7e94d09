//! Report Layout Builder: one `Overview` page with visuals placed by shelf packing.

use crate::analysis::AnalysisResult;
use crate::package::model::PRODUCT_TABLE;
use crate::package::model::REVENUE_TABLE;
use crate::package::model::SUMMARY_TABLE;
use serde_json::json;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

const PAGE_WIDTH: u32 = 1280;
const MIN_PAGE_HEIGHT: u32 = 720;
const GRID_COLUMNS: u32 = 4;
const MARGIN: u32 = 20;
const GAP: u32 = 20;
const CARD_HEIGHT: u32 = 120;
const CHART_HEIGHT: u32 = 260;

/// Errors raised by [`ReportLayout::validate`]
#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("Visual '{1}' lies outside page '{0}'")]
    OutOfPageError(String, String),

    #[error("Visuals '{1}' and '{2}' overlap on page '{0}'")]
    OverlapError(String, String, String),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VisualType {
    Card,
    LineChart,
    ClusteredBarChart,
    PieChart,
    TableEx,
}

impl VisualType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            VisualType::Card => "card",
            VisualType::LineChart => "lineChart",
            VisualType::ClusteredBarChart => "clusteredBarChart",
            VisualType::PieChart => "pieChart",
            VisualType::TableEx => "tableEx",
        }
    }

    /// (grid columns spanned, height in pixels)
    const fn footprint(&self) -> (u32, u32) {
        match self {
            VisualType::Card => (1, CARD_HEIGHT),
            _ => (2, CHART_HEIGHT),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct VisualContainer {
    pub name: String,
    pub visual_type: VisualType,
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub width: u32,
    pub height: u32,
    /// Model table the visual is bound to
    pub table: String,
    /// Projection role (`Category`, `Values`) to `Table.field` query references
    pub projections: Vec<(String, Vec<String>)>,
}

impl VisualContainer {
    fn overlaps(&self, other: &VisualContainer) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    fn to_json(&self) -> Value {
        let projections: Map<String, Value> = self
            .projections
            .iter()
            .map(|(role, references)| {
                let references: Vec<Value> = references.iter().map(|reference| json!({ "queryRef": reference })).collect();
                (role.to_owned(), Value::Array(references))
            })
            .collect();
        let config = json!({
            "name": self.name,
            "singleVisual": {
                "visualType": self.visual_type.as_str(),
                "projections": projections,
                "prototypeQuery": { "From": [{ "Entity": self.table }] },
                "objects": {},
            },
        });
        json!({
            "x": self.x,
            "y": self.y,
            "z": self.z,
            "width": self.width,
            "height": self.height,
            "config": config.to_string(),
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    pub name: String,
    pub display_name: String,
    pub width: u32,
    pub height: u32,
    pub containers: Vec<VisualContainer>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReportLayout {
    pub pages: Vec<Page>,
}

impl ReportLayout {
    /// Checks that every container lies inside its page and no two containers overlap.
    pub fn validate(&self) -> Result<(), LayoutError> {
        for page in &self.pages {
            for (index, container) in page.containers.iter().enumerate() {
                if container.x + container.width > page.width || container.y + container.height > page.height {
                    Err(LayoutError::OutOfPageError(page.name.to_owned(), container.name.to_owned()))?
                }
                if let Some(other) = page.containers[index + 1..].iter().find(|other| container.overlaps(other)) {
                    Err(LayoutError::OverlapError(page.name.to_owned(), container.name.to_owned(), other.name.to_owned()))?
                }
            }
        }
        Ok(())
    }

    /// The `Report/Layout` document.
    pub fn to_json(&self) -> Value {
        let pages: Vec<Value> = self
            .pages
            .iter()
            .enumerate()
            .map(|(order, page)| {
                json!({
                    "name": page.name,
                    "displayName": page.display_name,
                    "displayOrder": order,
                    "width": page.width,
                    "height": page.height,
                    "filters": "[]",
                    "visualContainers": page.containers.iter().map(VisualContainer::to_json).collect::<Vec<_>>(),
                })
            })
            .collect();
        json!({
            "id": 0,
            "name": "Report",
            "pages": pages,
            "config": json!({ "theme": { "name": "__default__" } }).to_string(),
            "layoutOptimization": 0,
            "resourcePackages": [],
        })
    }
}

/// Places visuals left to right on a fixed grid, opening a new shelf when a
/// visual does not fit the remaining columns.
struct ShelfPacker {
    column: u32,
    y: u32,
    shelf_height: u32,
    column_width: u32,
    containers: Vec<VisualContainer>,
}

impl ShelfPacker {
    fn new() -> Self {
        Self {
            column: 0,
            y: MARGIN,
            shelf_height: 0,
            column_width: (PAGE_WIDTH - 2 * MARGIN - (GRID_COLUMNS - 1) * GAP) / GRID_COLUMNS,
            containers: vec![],
        }
    }

    fn place(&mut self, name: &str, visual_type: VisualType, table: &str, category: Option<&str>, values: &[&str]) {
        let (span, height) = visual_type.footprint();
        if self.column + span > GRID_COLUMNS {
            self.y += self.shelf_height + GAP;
            self.column = 0;
            self.shelf_height = 0;
        }
        self.containers.push(VisualContainer {
            name: name.to_owned(),
            visual_type,
            x: MARGIN + self.column * (self.column_width + GAP),
            y: self.y,
            z: self.containers.len() as u32,
            width: span * self.column_width + (span - 1) * GAP,
            height,
            table: table.to_owned(),
            projections: category
                .map(|field| ("Category".to_owned(), vec![format!("{table}.{field}")]))
                .into_iter()
                .chain([("Values".to_owned(), values.iter().map(|field| format!("{table}.{field}")).collect())])
                .collect(),
        });
        self.column += span;
        self.shelf_height = self.shelf_height.max(height);
    }

    /// Bottom edge of the lowest visual
    fn bottom(&self) -> u32 {
        self.containers.iter().map(|container| container.y + container.height).max().unwrap_or(0)
    }
}

/// Builds the `Overview` page: KPI cards, revenue line chart, product bar and
/// pie charts, then the trend list.
pub fn build_layout(result: &AnalysisResult) -> ReportLayout {
    let mut packer = ShelfPacker::new();
    packer.place("Total Revenue", VisualType::Card, REVENUE_TABLE, None, &["Total Revenue"]);
    packer.place("Growth Rate", VisualType::Card, SUMMARY_TABLE, None, &["Growth Rate %"]);
    packer.place("Total Transactions", VisualType::Card, SUMMARY_TABLE, None, &["total_transactions"]);
    packer.place("Top Entity", VisualType::Card, SUMMARY_TABLE, None, &["top_entity"]);

    let trend_title = match result.metadata.granularity {
        Some(granularity) => format!("Revenue by {}", granularity.as_title()),
        None => "Revenue by Period".to_owned(),
    };
    packer.place(&trend_title, VisualType::LineChart, REVENUE_TABLE, Some("period"), &["value"]);
    packer.place("Product Performance", VisualType::ClusteredBarChart, PRODUCT_TABLE, Some("entity"), &["value"]);
    packer.place("Revenue Share", VisualType::PieChart, PRODUCT_TABLE, Some("entity"), &["value"]);
    packer.place(
        "Key Metrics",
        VisualType::TableEx,
        SUMMARY_TABLE,
        None,
        &["total_revenue", "growth_rate", "total_transactions", "top_entity"],
    );

    let height = (packer.bottom() + MARGIN).max(MIN_PAGE_HEIGHT);
    ReportLayout {
        pages: vec![Page {
            name: "Overview".to_owned(),
            display_name: "Executive Overview".to_owned(),
            width: PAGE_WIDTH,
            height,
            containers: packer.containers,
        }],
    }
}
