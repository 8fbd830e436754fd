//! Fixed-column tabular items

use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

use crate::error::{MeasError, Result, ResultExt};
use crate::primitives;
use crate::xml::{names, Element};

/// Separator between cells of one row in the textual encoding
const TOKEN_SEPARATOR: char = ',';
/// Separator between rows in the textual encoding
const BLOCK_SEPARATOR: char = ';';

/// Declared type of an array column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Bool,
    Time,
    Double,
    Long,
    Str,
}

impl ColumnType {
    /// Resolve an external component name; unknown names fail with
    /// `UnsupportedColumnType` (callers degrade to an untyped column)
    fn from_component_name(name: &str) -> Result<Self> {
        match name {
            "Boolean" => Ok(Self::Bool),
            "Time" => Ok(Self::Time),
            "Quantity" => Ok(Self::Double),
            "Count" => Ok(Self::Long),
            "Text" => Ok(Self::Str),
            other => Err(MeasError::UnsupportedColumnType {
                type_name: other.to_string(),
            }),
        }
    }

    fn component_name(self) -> &'static str {
        match self {
            Self::Bool => "Boolean",
            Self::Time => "Time",
            Self::Double => "Quantity",
            Self::Long => "Count",
            Self::Str => "Text",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Time => "utc_timestamp",
            Self::Double => "double",
            Self::Long => "long",
            Self::Str => "string",
        };
        f.write_str(name)
    }
}

/// One typed column of an [`Array`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    data_type: ColumnType,
    unit: Option<String>,
    label: Option<String>,
    description: Option<String>,
    type_supported: bool,
}

impl Column {
    /// Create a column; the name must be a valid name token
    /// (non-empty, no colon, no whitespace)
    pub fn new<S: Into<String>>(name: S, data_type: ColumnType) -> Result<Self> {
        let name = name.into();
        if name.is_empty()
            || name.contains(':')
            || name.chars().any(char::is_whitespace)
        {
            return Err(MeasError::InvalidColumnName { name });
        }
        Ok(Self {
            name,
            data_type,
            unit: None,
            label: None,
            description: None,
            type_supported: true,
        })
    }

    /// Attach a unit of measure; only legal on `Double` columns
    pub fn with_unit<S: Into<String>>(mut self, unit: S) -> Result<Self> {
        if self.data_type != ColumnType::Double {
            return Err(MeasError::UnitOnNonMeasureColumn { name: self.name });
        }
        self.unit = Some(unit.into());
        Ok(self)
    }

    /// Attach a human-readable label
    pub fn with_label<S: Into<String>>(mut self, label: S) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Attach a description
    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> ColumnType {
        self.data_type
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// False when the column was decoded from an external type outside the
    /// supported set and degraded to a string column
    pub fn type_supported(&self) -> bool {
        self.type_supported
    }
}

/// A single typed cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Bool(bool),
    Time(OffsetDateTime),
    Double(f64),
    Long(i64),
    Str(String),
}

impl CellValue {
    fn column_type(&self) -> ColumnType {
        match self {
            Self::Bool(_) => ColumnType::Bool,
            Self::Time(_) => ColumnType::Time,
            Self::Double(_) => ColumnType::Double,
            Self::Long(_) => ColumnType::Long,
            Self::Str(_) => ColumnType::Str,
        }
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<OffsetDateTime> for CellValue {
    fn from(v: OffsetDateTime) -> Self {
        Self::Time(v)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// A fixed-column table of typed cells
///
/// Every row holds exactly one optional cell per column, and every present
/// cell matches its column's declared type. Timestamp cells are UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Array {
    columns: Vec<Column>,
    rows: Vec<Vec<Option<CellValue>>>,
}

impl Array {
    /// Create an empty array over the given columns
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row of cells, one per column
    ///
    /// An absent cell, or a string cell that is empty after trimming, is
    /// stored as null. Fails with `CellCountMismatch`, `CellTypeMismatch`,
    /// `DateTime` (non-UTC timestamp cell) or `InvalidCellValue` (string
    /// cell containing a separator character).
    pub fn add_row(&mut self, cells: Vec<Option<CellValue>>) -> Result<()> {
        if cells.len() != self.columns.len() {
            return Err(MeasError::CellCountMismatch {
                expected: self.columns.len(),
                actual: cells.len(),
            });
        }
        let mut row = Vec::with_capacity(cells.len());
        for (index, (cell, column)) in cells.into_iter().zip(&self.columns).enumerate() {
            row.push(Self::normalise_cell(cell, column, index)?);
        }
        self.rows.push(row);
        Ok(())
    }

    fn normalise_cell(
        cell: Option<CellValue>,
        column: &Column,
        index: usize,
    ) -> Result<Option<CellValue>> {
        let Some(cell) = cell else {
            return Ok(None);
        };
        if let CellValue::Str(text) = &cell {
            if text.trim().is_empty() {
                return Ok(None);
            }
            if text.contains(TOKEN_SEPARATOR) || text.contains(BLOCK_SEPARATOR) {
                return Err(MeasError::InvalidCellValue {
                    message: format!(
                        "string cell '{text}' contains a separator character"
                    ),
                });
            }
        }
        if cell.column_type() != column.data_type {
            return Err(MeasError::CellTypeMismatch {
                index,
                column: column.name.clone(),
                expected: column.data_type.to_string(),
                actual: cell.column_type().to_string(),
            });
        }
        if let CellValue::Time(t) = cell {
            return Ok(Some(CellValue::Time(primitives::ensure_utc(t)?)));
        }
        Ok(Some(cell))
    }

    /// The cells of row `index`
    pub fn row(&self, index: usize) -> Result<&[Option<CellValue>]> {
        self.rows
            .get(index)
            .map(Vec::as_slice)
            .ok_or(MeasError::IndexOutOfBounds {
                index,
                len: self.rows.len(),
            })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Encode as a `swe:DataArray` element
    pub(crate) fn to_element(&self, _id_prefix: &str) -> Result<Element> {
        let mut element_type = Element::new("swe:DataRecord");
        for column in &self.columns {
            element_type.push_child(
                Element::new("swe:field")
                    .with_attr("name", &column.name)
                    .with_child(column_component(column)),
            );
        }
        let values_text = self.encode_values()?;
        Ok(Element::new("swe:DataArray")
            .with_child(
                Element::new("swe:elementCount").with_child(
                    Element::new("swe:Count").with_child(
                        Element::new("swe:value")
                            .with_text(primitives::encode_long(self.rows.len() as i64)),
                    ),
                ),
            )
            .with_child(
                Element::new("swe:elementType")
                    .with_attr("name", "row")
                    .with_child(element_type),
            )
            .with_child(
                Element::new("swe:encoding").with_child(
                    Element::new("swe:TextEncoding")
                        .with_attr("tokenSeparator", TOKEN_SEPARATOR.to_string())
                        .with_attr("blockSeparator", BLOCK_SEPARATOR.to_string())
                        .with_attr("decimalSeparator", "."),
                ),
            )
            .with_child(Element::new("swe:values").with_text(values_text)))
    }

    fn encode_values(&self) -> Result<String> {
        let mut blocks = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let mut tokens = Vec::with_capacity(row.len());
            for cell in row {
                tokens.push(match cell {
                    None => String::new(),
                    Some(CellValue::Bool(v)) => primitives::encode_bool(*v),
                    Some(CellValue::Time(t)) => primitives::encode_timestamp(*t)?,
                    Some(CellValue::Double(v)) => primitives::encode_double(*v),
                    Some(CellValue::Long(v)) => primitives::encode_long(*v),
                    Some(CellValue::Str(s)) => s.clone(),
                });
            }
            blocks.push(tokens.join(&TOKEN_SEPARATOR.to_string()));
        }
        Ok(blocks.join(&BLOCK_SEPARATOR.to_string()))
    }

    /// Decode from a `swe:DataArray` element
    ///
    /// Columns of an unsupported external type degrade to untyped string
    /// columns instead of failing; their flag is cleared so callers can see
    /// the degradation.
    pub(crate) fn from_element(element: &Element) -> Result<Self> {
        let element_type = element
            .required_child("elementType")?
            .required_child("DataRecord")?;
        let mut columns = Vec::new();
        for field in element_type.children_named("field") {
            let name = field.required_attr("name")?;
            columns.push(
                decode_column(name, field).context(format!("column '{name}'"))?,
            );
        }
        let mut array = Array::new(columns);
        let values_text = element.required_child("values")?.text();
        if !values_text.trim().is_empty() {
            for (index, block) in values_text.split(BLOCK_SEPARATOR).enumerate() {
                array
                    .decode_row(block)
                    .context(format!("row {index}"))?;
            }
        } else {
            // All-null rows of a single-column array encode to empty text;
            // only the element count distinguishes them from no rows.
            for _ in 0..decode_element_count(element)? {
                let nulls = vec![None; array.columns.len()];
                array.rows.push(nulls);
            }
        }
        Ok(array)
    }

    fn decode_row(&mut self, block: &str) -> Result<()> {
        let tokens: Vec<&str> = block.split(TOKEN_SEPARATOR).collect();
        if tokens.len() != self.columns.len() {
            return Err(MeasError::CellCountMismatch {
                expected: self.columns.len(),
                actual: tokens.len(),
            });
        }
        let mut cells = Vec::with_capacity(tokens.len());
        for (token, column) in tokens.into_iter().zip(&self.columns) {
            let token = token.trim();
            if token.is_empty() {
                cells.push(None);
                continue;
            }
            let cell = match column.data_type {
                ColumnType::Bool => CellValue::Bool(primitives::decode_bool(token)?),
                ColumnType::Time => {
                    CellValue::Time(primitives::decode_utc_timestamp(token)?)
                }
                ColumnType::Double => CellValue::Double(primitives::decode_double(token)?),
                ColumnType::Long => CellValue::Long(primitives::decode_long(token)?),
                ColumnType::Str => CellValue::Str(token.to_string()),
            };
            cells.push(Some(cell));
        }
        self.rows.push(cells);
        Ok(())
    }
}

fn decode_element_count(element: &Element) -> Result<i64> {
    match element
        .child("elementCount")
        .and_then(|c| c.child("Count"))
        .and_then(|c| c.child("value"))
    {
        Some(value) => primitives::decode_long(value.text()),
        None => Ok(0),
    }
}

fn column_component(column: &Column) -> Element {
    let kind = column.data_type.component_name();
    let mut component = Element::new(format!("swe:{kind}"));
    if let Some(label) = &column.label {
        component.push_child(Element::new("swe:label").with_text(label));
    }
    if let Some(description) = &column.description {
        component.push_child(Element::new("swe:description").with_text(description));
    }
    match column.data_type {
        ColumnType::Double => {
            let mut uom = Element::new("swe:uom");
            if let Some(unit) = &column.unit {
                uom.set_attr("code", unit);
            }
            component.push_child(uom);
        }
        ColumnType::Time => {
            component.push_child(
                Element::new("swe:uom").with_attr("xlink:href", names::UOM_ISO8601),
            );
        }
        _ => {}
    }
    component
}

fn decode_column(name: &str, field: &Element) -> Result<Column> {
    let Some(component) = field.children().first() else {
        return Err(MeasError::required("column component"));
    };
    let column = match ColumnType::from_component_name(component.local_name()) {
        Ok(data_type) => {
            let mut column = Column::new(name, data_type)?;
            if data_type == ColumnType::Double {
                if let Some(code) = component.child("uom").and_then(|u| u.attr("code")) {
                    if !code.is_empty() {
                        column = column.with_unit(code)?;
                    }
                }
            }
            column
        }
        Err(MeasError::UnsupportedColumnType { type_name }) => {
            tracing::warn!(
                column = name,
                kind = type_name,
                "unsupported column type, degrading to string"
            );
            let mut column = Column::new(name, ColumnType::Str)?;
            column.type_supported = false;
            column
        }
        Err(other) => return Err(other),
    };
    let mut column = column;
    if let Some(label) = component.child("label") {
        column = column.with_label(label.text());
    }
    if let Some(description) = component.child("description") {
        column = column.with_description(description.text());
    }
    Ok(column)
}
