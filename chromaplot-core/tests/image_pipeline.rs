use chromaplot_core::chromaticity::{image_to_xy, DiagramMethod};
use chromaplot_core::{
    get_colorspace, read_image_from_bytes, rescale_image_fast, srgb, NamedBytes,
};
use image::{DynamicImage, ImageBuffer, ImageFormat, Luma, Rgb};
use tempfile::NamedTempFile;

fn write_png(image: &DynamicImage) -> NamedTempFile {
    let file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("create temp png");
    image
        .save_with_format(file.path(), ImageFormat::Png)
        .expect("write png");
    file
}

#[test]
fn grayscale_file_decodes_to_equal_channels() {
    let gray = ImageBuffer::from_fn(8, 8, |x, y| Luma([(x * 30 + y) as u8]));
    let file = write_png(&DynamicImage::ImageLuma8(gray));

    let mut named = NamedBytes::from_path(file.path()).expect("read temp png");
    let image = read_image_from_bytes(&mut named).expect("decode png");

    assert_eq!(image.dimensions(), (8, 8));
    for px in image.pixels() {
        assert_eq!(px[0], px[1]);
        assert_eq!(px[1], px[2]);
    }
}

#[test]
fn decode_then_rescale_then_project() {
    let rgb = ImageBuffer::from_fn(100, 50, |x, _| {
        if x < 50 {
            Rgb([255u8, 0, 0])
        } else {
            Rgb([255u8, 255, 255])
        }
    });
    let file = write_png(&DynamicImage::ImageRgb8(rgb));

    let mut named = NamedBytes::from_path(file.path()).expect("read temp png");
    let mut image = read_image_from_bytes(&mut named).expect("decode png");
    image = rescale_image_fast(&image, 10);
    assert!(image.width() <= 10);
    assert_eq!(image.height(), 5);

    let colorspace = srgb();
    colorspace.decode_image(&mut image);
    let points = image_to_xy(&image, &colorspace);
    assert_eq!(points.len(), (image.width() * image.height()) as usize);

    let red = get_colorspace("sRGB").unwrap().primaries()[0];
    let uv_red = DiagramMethod::Cie1976Ucs.project(red);
    let projected: Vec<[f64; 2]> = points
        .iter()
        .map(|xy| DiagramMethod::Cie1976Ucs.project(*xy))
        .collect();
    assert!(projected
        .iter()
        .any(|uv| (uv[0] - uv_red[0]).abs() < 1e-4 && (uv[1] - uv_red[1]).abs() < 1e-4));
}
