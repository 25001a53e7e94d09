use crate::error::RustyPbixError;
use quick_xml::events::BytesDecl;
use quick_xml::events::BytesEnd;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::Writer;
use std::io::Cursor;

const CONTENT_TYPES_NAMESPACE: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const JSON_CONTENT_TYPE: &str = "application/json";
const XML_CONTENT_TYPE: &str = "application/xml";
const TEXT_CONTENT_TYPE: &str = "text/plain";

/// Content type of a package entry: plain text for `Version`, JSON otherwise.
pub(super) fn content_type_of(entry: &str) -> &'static str {
    if entry == "Version" {
        TEXT_CONTENT_TYPE
    } else {
        JSON_CONTENT_TYPE
    }
}

/// Writes `[Content_Types].xml`: JSON and XML defaults plus one override per entry.
pub(super) fn content_types_xml<'a>(entries: impl IntoIterator<Item = &'a str>) -> Result<Vec<u8>, RustyPbixError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("Types").with_attributes([("xmlns", CONTENT_TYPES_NAMESPACE)])))?;
    for (extension, content_type) in [("json", JSON_CONTENT_TYPE), ("xml", XML_CONTENT_TYPE)] {
        writer.write_event(Event::Empty(
            BytesStart::new("Default").with_attributes([("Extension", extension), ("ContentType", content_type)]),
        ))?;
    }
    for entry in entries {
        let part_name = format!("/{entry}");
        writer.write_event(Event::Empty(
            BytesStart::new("Override").with_attributes([("PartName", part_name.as_str()), ("ContentType", content_type_of(entry))]),
        ))?;
    }
    writer.write_event(Event::End(BytesEnd::new("Types")))?;
    Ok(writer.into_inner().into_inner())
}
