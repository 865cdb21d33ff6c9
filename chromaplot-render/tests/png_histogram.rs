use chromaplot_core::{srgb, FloatImage};
use chromaplot_render::vector_export::{ExportConfig, VectorExporter};
use chromaplot_render::{plot_rgb_chromaticities_cie1931, DiagramOptions};
use image::{ImageBuffer, Rgb};

fn demo_image_dense() -> FloatImage {
    // a ramp of hues to exercise scatter drawing
    ImageBuffer::from_fn(32, 32, |x, y| {
        Rgb([x as f32 / 31.0, y as f32 / 31.0, 0.25])
    })
}

fn histogram(png_bytes: &[u8]) -> [u32; 256] {
    let img = image::load_from_memory(png_bytes).unwrap().to_rgba8();
    let mut hist = [0u32; 256];
    for p in img.pixels() {
        // bucket by alpha for stability across tiny color diffs
        hist[p[3] as usize] += 1;
    }
    hist
}

#[test]
fn png_histogram_is_stable() {
    let options = DiagramOptions {
        show_legend: false,
        show_axes: false,
        transparent_background: true,
        ..DiagramOptions::default()
    };
    let figure =
        plot_rgb_chromaticities_cie1931(&demo_image_dense(), &srgb(), &[], &options).unwrap();
    let exporter = VectorExporter::new(ExportConfig::default());

    let dir = tempfile::tempdir().unwrap();
    let f1 = dir.path().join("d1.png");
    let f2 = dir.path().join("d2.png");

    exporter.export_png(&figure, &f1).unwrap();
    exporter.export_png(&figure, &f2).unwrap();
    let b1 = std::fs::read(&f1).unwrap();
    let b2 = std::fs::read(&f2).unwrap();

    let h1 = histogram(&b1);
    let h2 = histogram(&b2);
    assert_eq!(h1, h2, "Alpha histogram differs between identical renders");
    // transparent figure background
    assert!(h1[0] > 0);
}

#[test]
fn png_matches_figure_size() {
    let figure = plot_rgb_chromaticities_cie1931(
        &demo_image_dense(),
        &srgb(),
        &[],
        &DiagramOptions::default(),
    )
    .unwrap();
    let image = VectorExporter::new(ExportConfig::default()).render_png(&figure).unwrap();
    assert_eq!(image.width(), figure.width);
    assert_eq!(image.height(), figure.height);
}
