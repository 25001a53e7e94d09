mod common;

use rusty_pbix::package;
use rusty_pbix::package::MANIFEST;
use rusty_pbix::AnalysisResult;
use rusty_pbix::Config;
use std::collections::BTreeSet;
use std::io::Cursor;
use zip::ZipArchive;

fn sales() -> AnalysisResult {
    rusty_pbix::analyze_bytes(common::SALES_CSV.as_bytes(), "csv", &Config::default()).unwrap()
}

#[test]
fn assembling_twice_is_byte_identical() {
    let result = sales();
    let first = package::assemble(&package::build_model(&result).unwrap(), &package::build_layout(&result)).unwrap();
    let second = package::assemble(&package::build_model(&result).unwrap(), &package::build_layout(&result)).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_bytes().unwrap(), second.to_bytes().unwrap());
}

#[test]
fn package_holds_exactly_the_manifest() {
    for result in [sales(), AnalysisResult::default()] {
        let package = rusty_pbix::export_package(&result).unwrap();
        assert_eq!(package.names(), MANIFEST);

        let mut archive = ZipArchive::new(Cursor::new(package.to_bytes().unwrap())).unwrap();
        let names: BTreeSet<String> = archive.file_names().map(str::to_owned).collect();
        let expected: BTreeSet<String> = MANIFEST.iter().map(|name| name.to_string()).collect();
        assert_eq!(names, expected);
        assert!(archive.by_name("DataModelSchema").is_ok());
    }
}

#[test]
fn exported_analysis_json_round_trips() {
    let result = sales();
    let json = result.to_json(true).unwrap();
    let parsed = AnalysisResult::from_json(&json).unwrap();
    assert_eq!(parsed, result);
    assert_eq!(rusty_pbix::export_bytes(&parsed).unwrap(), rusty_pbix::export_bytes(&result).unwrap());
}

#[test]
fn model_carries_analysis_tables() {
    let model = package::build_model(&sales()).unwrap();
    model.validate().unwrap();
    for name in [package::REVENUE_TABLE, package::PRODUCT_TABLE, package::SUMMARY_TABLE] {
        assert!(model.table(name).is_some(), "missing {name}");
    }
    let revenue = model.table(package::REVENUE_TABLE).unwrap();
    assert_eq!(revenue.rows.len(), 3);
}
