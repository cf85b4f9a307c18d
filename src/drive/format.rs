//! Cell formatting: hex colors, native `CellFormat` objects and field masks.
//!
//! The field mask sent with a `repeatCell` request must name exactly the
//! top-level keys present in the format object, otherwise the API resets
//! attributes the caller never mentioned.

use crate::drive::range::GridRange;
use crate::error::ServerError;
use crate::tools::inputs::FormatSpec;
use serde::Serialize;
use serde_json::{json, Value};

/// RGB color with channels in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl Color {
    /// Parse `#rrggbb`, `rrggbb` or `#rgb`.
    pub fn from_hex(input: &str) -> Result<Self, ServerError> {
        let invalid = || ServerError::InvalidColor(input.to_string());
        let hex = input.trim().trim_start_matches('#');

        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let expanded: String = match hex.len() {
            6 => hex.to_string(),
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            _ => return Err(invalid()),
        };

        let channel = |idx: usize| -> Result<f64, ServerError> {
            u8::from_str_radix(&expanded[idx..idx + 2], 16)
                .map(|v| f64::from(v) / 255.0)
                .map_err(|_| invalid())
        };

        Ok(Self {
            red: channel(0)?,
            green: channel(2)?,
            blue: channel(4)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFormat {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
}

impl TextFormat {
    fn is_empty(&self) -> bool {
        self.foreground_color.is_none()
            && self.font_size.is_none()
            && self.bold.is_none()
            && self.italic.is_none()
    }
}

/// Sheets API `CellFormat`, holding only the attributes the caller supplied.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellFormat {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_format: Option<TextFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horizontal_alignment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertical_alignment: Option<String>,
}

impl CellFormat {
    /// Top-level keys present, in wire order.
    pub fn field_mask(&self) -> FieldMask {
        let mut fields = Vec::new();
        if self.background_color.is_some() {
            fields.push("backgroundColor");
        }
        if self.text_format.is_some() {
            fields.push("textFormat");
        }
        if self.horizontal_alignment.is_some() {
            fields.push("horizontalAlignment");
        }
        if self.vertical_alignment.is_some() {
            fields.push("verticalAlignment");
        }
        FieldMask(fields)
    }
}

/// Names of the `userEnteredFormat` members a request touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMask(Vec<&'static str>);

impl FieldMask {
    pub fn fields(&self) -> &[&'static str] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `userEnteredFormat(k1,k2,...)`
    pub fn render(&self) -> String {
        format!("userEnteredFormat({})", self.0.join(","))
    }
}

fn alignment(value: &str, allowed: &[&str], field: &str) -> Result<String, ServerError> {
    let upper = value.trim().to_ascii_uppercase();
    if allowed.contains(&upper.as_str()) {
        Ok(upper)
    } else {
        Err(ServerError::invalid_arguments(
            "format_sheet",
            format!("{} must be one of {}", field, allowed.join(", ")),
        ))
    }
}

/// Translate the tool's formatting object into a native `CellFormat`.
pub fn translate(spec: &FormatSpec) -> Result<CellFormat, ServerError> {
    let text_format = TextFormat {
        foreground_color: spec.text_color.as_deref().map(Color::from_hex).transpose()?,
        font_size: spec.font_size,
        bold: spec.bold,
        italic: spec.italic,
    };

    let format = CellFormat {
        background_color: spec
            .background_color
            .as_deref()
            .map(Color::from_hex)
            .transpose()?,
        text_format: (!text_format.is_empty()).then_some(text_format),
        horizontal_alignment: spec
            .horizontal_alignment
            .as_deref()
            .map(|v| alignment(v, &["LEFT", "CENTER", "RIGHT"], "horizontalAlignment"))
            .transpose()?,
        vertical_alignment: spec
            .vertical_alignment
            .as_deref()
            .map(|v| alignment(v, &["TOP", "MIDDLE", "BOTTOM"], "verticalAlignment"))
            .transpose()?,
    };

    if format.field_mask().is_empty() {
        return Err(ServerError::invalid_arguments(
            "format_sheet",
            "formatting must set at least one attribute",
        ));
    }

    Ok(format)
}

/// The single-request `batchUpdate` body applying `format` to `grid`.
pub fn repeat_cell_request(grid: &GridRange, format: &CellFormat) -> Value {
    json!({
        "requests": [{
            "repeatCell": {
                "range": grid,
                "cell": { "userEnteredFormat": format },
                "fields": format.field_mask().render(),
            }
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_colors() {
        let red = Color::from_hex("#ff0000").unwrap();
        assert_eq!((red.red, red.green, red.blue), (1.0, 0.0, 0.0));

        let short = Color::from_hex("#f00").unwrap();
        assert_eq!(short, red);

        let bare = Color::from_hex("FF0000").unwrap();
        assert_eq!(bare, red);

        let grey = Color::from_hex("#808080").unwrap();
        assert!((grey.green - 128.0 / 255.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bad_hex_colors() {
        for bad in ["red", "#ff00", "#gg0000", "", "#ff00000", "#ïï0000"] {
            assert!(
                matches!(Color::from_hex(bad), Err(ServerError::InvalidColor(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_mask_is_exactly_present_keys() {
        let spec = FormatSpec {
            bold: Some(true),
            background_color: Some("#ff0000".into()),
            ..Default::default()
        };
        let format = translate(&spec).unwrap();
        let mask = format.field_mask();
        assert_eq!(mask.fields(), &["backgroundColor", "textFormat"]);
        assert_eq!(mask.render(), "userEnteredFormat(backgroundColor,textFormat)");
        assert_eq!(
            format.background_color,
            Some(Color {
                red: 1.0,
                green: 0.0,
                blue: 0.0
            })
        );

        let json = serde_json::to_value(&format).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 2);
        assert_eq!(json["textFormat"], json!({"bold": true}));
    }

    #[test]
    fn test_empty_formatting_rejected() {
        let err = translate(&FormatSpec::default()).unwrap_err();
        assert!(matches!(err, ServerError::InvalidArguments { .. }));
    }

    #[test]
    fn test_alignment_validated() {
        let spec = FormatSpec {
            horizontal_alignment: Some("center".into()),
            ..Default::default()
        };
        let format = translate(&spec).unwrap();
        assert_eq!(format.horizontal_alignment.as_deref(), Some("CENTER"));

        let spec = FormatSpec {
            vertical_alignment: Some("sideways".into()),
            ..Default::default()
        };
        assert!(translate(&spec).is_err());
    }

    #[test]
    fn test_repeat_cell_request_shape() {
        let grid = GridRange {
            sheet_id: 3,
            start_row_index: 0,
            end_row_index: 2,
            start_column_index: 0,
            end_column_index: 1,
        };
        let format = translate(&FormatSpec {
            italic: Some(true),
            ..Default::default()
        })
        .unwrap();

        let body = repeat_cell_request(&grid, &format);
        let requests = body["requests"].as_array().unwrap();
        assert_eq!(requests.len(), 1);
        let repeat = &requests[0]["repeatCell"];
        assert_eq!(repeat["range"]["sheetId"], 3);
        assert_eq!(repeat["range"]["endRowIndex"], 2);
        assert_eq!(repeat["fields"], "userEnteredFormat(textFormat)");
        assert_eq!(repeat["cell"]["userEnteredFormat"]["textFormat"]["italic"], true);
    }
}
