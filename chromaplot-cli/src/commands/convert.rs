//! Convert command - re-express a colour string in another colorspace

use anyhow::Result;

use chromaplot_core::{format_color, get_colorspace, parse_color, ColorError, ColorStringFormat};

use crate::error::CliError;

pub fn execute(
    value: &str,
    format: &str,
    from: &str,
    to: &str,
    output_format: Option<&str>,
) -> Result<()> {
    let converted = convert(value, format, from, to, output_format)?;
    println!("{}", converted);
    Ok(())
}

fn convert(
    value: &str,
    format: &str,
    from: &str,
    to: &str,
    output_format: Option<&str>,
) -> Result<String, CliError> {
    let input_format = parse_format(format)?;
    let output_format = output_format.map(parse_format).transpose()?.unwrap_or(input_format);

    let source = get_colorspace(from).map_err(map_color_error)?;
    let target = get_colorspace(to).map_err(map_color_error)?;
    let color = parse_color(value, input_format, source).map_err(map_color_error)?;

    log::debug!("Converting {:?} from {} to {}", color.to_array(), from, to);
    let converted = color.as_colorspace(&target);
    Ok(format_color(&converted, output_format))
}

fn parse_format(value: &str) -> Result<ColorStringFormat, CliError> {
    value.parse().map_err(map_color_error)
}

fn map_color_error(error: ColorError) -> CliError {
    match error {
        ColorError::UnknownColorspace(name) => CliError::unknown_colorspace(name),
        ColorError::UnknownColorFormat(_) => CliError::invalid_format(error.to_string()),
        other => CliError::validation(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_colorspace_is_identity() {
        let out = convert("0.25, 0.5, 0.75", "float_d4", "sRGB", "srgb", None).unwrap();
        assert_eq!(out, "0.2500, 0.5000, 0.7500");
    }

    #[test]
    fn test_hex_to_linear_float() {
        let out = convert("#FFFFFF", "hexadecimal", "sRGB", "ACEScg", Some("float_d2")).unwrap();
        assert_eq!(out, "1.00, 1.00, 1.00");
    }

    #[test]
    fn test_errors_are_classified() {
        assert!(matches!(
            convert("0.1 0.2 0.3", "float_d4", "sRGB", "Rec2100", None),
            Err(CliError::UnknownColorspace { .. })
        ));
        assert!(matches!(
            convert("0.1 0.2 0.3", "octal", "sRGB", "sRGB", None),
            Err(CliError::InvalidFormat { .. })
        ));
        assert!(matches!(
            convert("nope", "float_d4", "sRGB", "sRGB", None),
            Err(CliError::Validation { .. })
        ));
    }
}
