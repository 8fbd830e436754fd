//! Namespace prefixes, URIs and fixed vocabulary of the wire format

/// Prefix/URI pairs declared on every document root, in emission order
pub const NAMESPACES: &[(&str, &str)] = &[
    ("xmlns:om", "http://www.opengis.net/om/2.0"),
    ("xmlns:gml", "http://www.opengis.net/gml/3.2"),
    ("xmlns:swe", "http://www.opengis.net/swe/2.0"),
    ("xmlns:tsml", "http://www.opengis.net/tsml/1.0"),
    ("xmlns:sps", "http://www.opengis.net/sps/2.0"),
    ("xmlns:fes", "http://www.opengis.net/fes/2.0"),
    ("xmlns:xlink", "http://www.w3.org/1999/xlink"),
    ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
    ("xmlns:xs", "http://www.w3.org/2001/XMLSchema"),
    ("xmlns:cocop", "http://www.cocop-spire.eu/om-custom/1.1"),
];

/// Observation type URI prefix for the standard O&M vocabulary
pub const OBS_TYPE_PREFIX_OGC: &str = "http://www.opengis.net/def/observationType/OGC-OM/2.0/";

/// Observation type URI prefix for the custom vocabulary
pub const OBS_TYPE_PREFIX_COCOP: &str = "cocop/observationType/";

/// Unit-of-measure reference emitted on `swe:Time` components
pub const UOM_ISO8601: &str = "http://www.opengis.net/def/uom/ISO-8601/0/Gregorian";

/// Field name of the placeholder emitted for empty data records
///
/// The external schema forbids a record with no fields, so an empty record
/// is encoded with this single marker field and the marker is stripped again
/// on decode. The name is reserved; user fields must not use it.
pub const EMPTY_RECORD_FIELD: &str = "cocop_empty_record";

/// Add the namespace declarations to a document root element
pub fn declare_namespaces(el: &mut super::Element) {
    for (prefix, uri) in NAMESPACES {
        el.set_attr(*prefix, *uri);
    }
}
