//! Colorspaces command - list the registry

use anyhow::Result;

use chromaplot_core::{available_colorspaces, Colorspace, TransferFunction};

pub fn execute(details: bool) -> Result<()> {
    let colorspaces = available_colorspaces();
    log::debug!("{} colorspaces registered", colorspaces.len());

    for colorspace in &colorspaces {
        if details {
            println!("{}", describe(colorspace));
        } else {
            println!("{}", colorspace.name());
        }
    }
    Ok(())
}

fn describe(colorspace: &Colorspace) -> String {
    let [r, g, b] = colorspace.primaries();
    let whitepoint = colorspace.whitepoint();
    format!(
        "{}\n  primaries:  R({:.4}, {:.4}) G({:.4}, {:.4}) B({:.4}, {:.4})\n  whitepoint: {} ({:.4}, {:.4})\n  transfer:   {}",
        colorspace.name(),
        r[0],
        r[1],
        g[0],
        g[1],
        b[0],
        b[1],
        whitepoint.name,
        whitepoint.xy[0],
        whitepoint.xy[1],
        transfer_name(colorspace.transfer()),
    )
}

fn transfer_name(transfer: TransferFunction) -> String {
    match transfer {
        TransferFunction::Linear => "linear".to_string(),
        TransferFunction::Srgb => "sRGB".to_string(),
        TransferFunction::Gamma(gamma) => format!("gamma {}", gamma),
        TransferFunction::Rec709 => "BT.709".to_string(),
        TransferFunction::ProPhoto => "ROMM RGB".to_string(),
    }
}
