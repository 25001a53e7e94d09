//! Export side of the pipeline: data model, report layout, package entries and
//! the archive sink.

mod assembler;
mod content_types;
mod layout;
mod model;
mod writer;

pub use assembler::assemble;
pub use assembler::Package;
pub use assembler::MANIFEST;
pub use layout::build_layout;
pub use layout::LayoutError;
pub use layout::Page;
pub use layout::ReportLayout;
pub use layout::VisualContainer;
pub use layout::VisualType;
pub use model::build_model;
pub use model::Cardinality;
pub use model::DataModelSchema;
pub use model::DataType;
pub use model::Measure;
pub use model::ModelColumn;
pub use model::ModelTable;
pub use model::ModelValue;
pub use model::Relationship;
pub use model::PRODUCT_TABLE;
pub use model::REVENUE_TABLE;
pub use model::SUMMARY_TABLE;
pub use writer::write_archive;
