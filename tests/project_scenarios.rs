use image::Rgba;

use photofe::components::overlay::OverlayCommit;
use photofe::ops::adjustments::Adjustment;
use photofe::ops::filters::Filter;
use photofe::ops::mask::MaskShape;
use photofe::ops::shapes::ShapeTool;
use photofe::{EditorError, PixelBuffer, Project};

const WHITE: [u8; 4] = [255, 255, 255, 255];
const RED: [u8; 4] = [255, 0, 0, 255];

fn gradient(w: u32, h: u32) -> PixelBuffer {
    let mut buf = PixelBuffer::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let r = (x * 255 / w.max(1)) as u8;
            let g = (y * 255 / h.max(1)) as u8;
            buf.put_pixel(x, y, Rgba([r, g, 255 - r / 2, 255]));
        }
    }
    buf
}

fn project_with(image: PixelBuffer) -> Project {
    let mut p = Project::new(50, Some(11));
    assert!(p.load_image(image));
    p
}

#[test]
fn brightness_down_and_back_on_white() {
    let mut p = project_with(PixelBuffer::new_filled(100, 100, WHITE));

    assert_eq!(p.set_adjustment(Adjustment::Brightness, 0.0), Some(0.0));
    let out = p.export();
    assert!(out.as_raw().chunks_exact(4).all(|px| px == [155, 155, 155, 255]));

    p.set_adjustment(Adjustment::Brightness, 200.0);
    let out = p.export();
    assert!(out.as_raw().chunks_exact(4).all(|px| px == WHITE));
}

#[test]
fn repeated_slider_value_is_idempotent() {
    let mut once = project_with(gradient(24, 16));
    once.set_adjustment(Adjustment::Saturation, 160.0);

    let mut twice = project_with(gradient(24, 16));
    twice.set_adjustment(Adjustment::Saturation, 160.0);
    twice.set_adjustment(Adjustment::Saturation, 160.0);

    assert_eq!(once.export(), twice.export());
}

#[test]
fn contrast_does_not_compound() {
    let mut moved = project_with(gradient(20, 20));
    moved.set_adjustment(Adjustment::Contrast, 150.0);
    moved.set_adjustment(Adjustment::Contrast, 100.0);

    let mut direct = project_with(gradient(20, 20));
    direct.set_adjustment(Adjustment::Contrast, 100.0);

    assert_eq!(moved.export(), direct.export());
    assert_eq!(moved.export(), gradient(20, 20));
}

#[test]
fn slider_move_discards_filter() {
    let original = gradient(16, 16);
    let mut p = project_with(original.clone());

    assert!(p.apply_filter(Filter::Moon));
    assert_ne!(p.export(), original);

    p.set_adjustment(Adjustment::Brightness, 200.0);
    assert_eq!(p.export(), original);
}

#[test]
fn undo_all_then_redo_all() {
    let mut p = project_with(gradient(12, 8));
    let baseline = p.export();

    p.set_adjustment(Adjustment::Sepia, 50.0);
    p.apply_filter(Filter::Hudson);
    p.rotate_right();
    p.add_layer();
    p.apply_mask(MaskShape::Circle);
    let final_image = p.export();
    let final_dims = p.dimensions();
    assert_eq!(final_dims, (8, 12));

    for _ in 0..5 {
        assert!(p.undo());
    }
    assert!(!p.undo());
    assert_eq!(p.export(), baseline);
    assert_eq!(p.dimensions(), (12, 8));
    assert_eq!(p.layers().len(), 1);
    assert!(p.adjustments().is_default());

    for _ in 0..5 {
        assert!(p.redo());
    }
    assert!(!p.redo());
    assert_eq!(p.export(), final_image);
    assert_eq!(p.dimensions(), final_dims);
    assert_eq!(p.layers().len(), 2);
}

#[test]
fn new_action_after_undo_drops_redo() {
    let mut p = project_with(gradient(8, 8));
    p.apply_filter(Filter::Retro);
    p.apply_filter(Filter::BlackAndWhite);
    assert!(p.undo());
    assert!(p.can_redo());

    p.set_adjustment(Adjustment::Invert, 100.0);
    assert!(!p.can_redo());
    assert!(!p.redo());
    assert_eq!(
        p.history_labels(),
        vec!["Load image", "Filter retro", "Adjust invert to 100"]
    );
}

#[test]
fn undo_restores_slider_state() {
    let mut p = project_with(gradient(8, 8));
    p.set_adjustment(Adjustment::Brightness, 300.0);
    p.set_adjustment(Adjustment::Hue, 90.0);
    p.undo();
    assert_eq!(p.adjustments().get(Adjustment::Hue), 0.0);
    assert_eq!(p.adjustments().get(Adjustment::Brightness), 300.0);

    // next slider move still replays from the loaded image
    p.set_adjustment(Adjustment::Brightness, 200.0);
    assert_eq!(p.export(), gradient(8, 8));
}

#[test]
fn five_cell_collage_in_400_square() {
    for seed in [0u64, 5, 99, 1234] {
        let mut p = Project::new(50, Some(seed));
        p.load_image(PixelBuffer::new_filled(400, 400, WHITE));
        assert_eq!(p.generate_collage(5).unwrap(), 5);

        let cells = p.collage().cells();
        assert_eq!(cells.len(), 5);
        for (i, a) in cells.iter().enumerate() {
            assert!(a.x + a.width <= 400 && a.y + a.height <= 400);
            assert!(a.width >= 100 && a.height >= 200);
            for b in &cells[i + 1..] {
                assert!(!a.collides_with(b));
            }
        }
        assert!(p.history_labels().last().is_some_and(|l| l.starts_with("Collage")));
    }
}

#[test]
fn dragged_shape_reverts_on_undo() {
    let mut p = project_with(PixelBuffer::new_filled(40, 40, WHITE));

    assert!(p.begin_shape(ShapeTool::Rectangle, RED));
    p.pointer_down(5.0, 5.0);
    p.pointer_move(15.0, 15.0);
    let placed = p.pointer_up(25.0, 25.0);
    assert!(matches!(placed, Some(OverlayCommit::Placed { tool: ShapeTool::Rectangle, .. })));
    let before_drag = p.active_pixels().clone();
    assert_eq!(before_drag.get_pixel(15, 15), Rgba(RED));

    p.pointer_down(15.0, 15.0);
    p.pointer_move(20.0, 20.0);
    let moved = p.pointer_up(25.0, 25.0);
    assert_eq!(moved, Some(OverlayCommit::Moved { index: 0, dx: 10.0, dy: 10.0 }));
    assert_eq!(p.active_pixels().get_pixel(8, 8), Rgba(WHITE));
    assert_eq!(p.active_pixels().get_pixel(32, 32), Rgba(RED));

    assert!(p.undo());
    assert_eq!(p.active_pixels(), &before_drag);
    assert_eq!(p.overlay().items()[0].anchor(), (5.0, 5.0));
}

#[test]
fn text_can_be_dragged_by_its_box() {
    let mut p = project_with(PixelBuffer::new_filled(60, 60, WHITE));
    // no font: 2 chars × 20 × 0.6 = 24 px wide
    assert_eq!(p.add_text("hi", 10.0, 30.0, 20.0, RED), Some(0));

    p.pointer_down(15.0, 20.0);
    p.pointer_move(20.0, 22.0);
    let commit = p.pointer_up(25.0, 25.0);
    assert_eq!(commit, Some(OverlayCommit::Moved { index: 0, dx: 10.0, dy: 5.0 }));
    assert_eq!(p.overlay().items()[0].anchor(), (20.0, 35.0));

    p.pointer_down(55.0, 55.0);
    assert_eq!(p.pointer_up(58.0, 58.0), None);
}

#[test]
fn last_layer_cannot_be_removed() {
    let mut p = project_with(gradient(8, 8));
    assert!(!p.remove_layer());
    assert_eq!(p.layers().len(), 1);
    assert_eq!(p.history_labels().len(), 1);

    assert_eq!(p.add_layer(), Some(1));
    assert!(p.remove_layer());
    assert_eq!(p.layers().len(), 1);
    assert_eq!(p.layers().active_index(), 0);
    assert!(!p.select_layer(3));
}

#[test]
fn shape_on_upper_layer_composites_over_background() {
    let mut p = project_with(PixelBuffer::new_filled(30, 30, WHITE));
    p.add_layer();
    p.begin_shape(ShapeTool::Circle, [0, 0, 255, 255]);
    p.pointer_down(15.0, 15.0);
    p.pointer_up(25.0, 15.0);

    let out = p.export();
    assert_eq!(out.get_pixel(15, 15), Rgba([0, 0, 255, 255]));
    assert_eq!(out.get_pixel(1, 1), Rgba(WHITE));
    assert_eq!(p.layers().layers()[0].pixels.get_pixel(15, 15), Rgba(WHITE));
}

#[test]
fn history_is_bounded_but_keeps_baseline() {
    let mut p = Project::new(4, None);
    p.load_image(gradient(4, 4));
    for v in [10.0, 20.0, 30.0, 40.0, 50.0] {
        p.set_adjustment(Adjustment::Opacity, v);
    }
    let labels = p.history_labels();
    assert_eq!(labels.len(), 4);
    assert_eq!(labels[0], "Load image");
    assert_eq!(labels[3], "Adjust opacity to 50");
}

#[test]
fn crop_and_resize_rebuild_the_original() {
    let mut p = project_with(gradient(40, 30));
    p.set_adjustment(Adjustment::Grayscale, 100.0);
    assert!(p.crop(5, 5, 1000, 10).unwrap());
    assert_eq!(p.dimensions(), (35, 10));
    assert!(p.crop(500, 500, 5, 5).is_err());
    assert_eq!(p.dimensions(), (35, 10));

    // the grayscale is baked in; a further slider move works on the crop
    p.set_adjustment(Adjustment::Invert, 100.0);
    assert_eq!(p.active_pixels().dimensions(), (35, 10));
    assert!(p.resize(7, 2).unwrap());
    assert_eq!(p.export().dimensions(), (7, 2));
}

#[test]
fn switching_layers_does_not_compound_sliders() {
    let mut p = project_with(PixelBuffer::new_filled(4, 4, [100, 100, 100, 255]));
    p.set_adjustment(Adjustment::Brightness, 240.0);
    assert_eq!(p.active_pixels().get_pixel(0, 0), Rgba([120, 120, 120, 255]));

    p.add_layer();
    p.set_adjustment(Adjustment::Opacity, 90.0);
    assert!(p.select_layer(0));
    p.set_adjustment(Adjustment::Brightness, 240.0);
    assert_eq!(p.active_pixels().get_pixel(0, 0), Rgba([120, 120, 120, 230]));

    // neutral brightness and opacity bring layer 0 all the way back
    p.set_adjustment(Adjustment::Brightness, 200.0);
    p.set_adjustment(Adjustment::Opacity, 100.0);
    assert_eq!(p.active_pixels().get_pixel(0, 0), Rgba([100, 100, 100, 255]));
}

#[test]
fn neutral_slider_after_layer_round_trip_restores_layer() {
    let mut p = project_with(PixelBuffer::new_filled(4, 4, [100, 100, 100, 255]));
    p.set_adjustment(Adjustment::Brightness, 240.0);
    p.add_layer();
    p.set_adjustment(Adjustment::Brightness, 240.0);
    p.select_layer(0);
    p.set_adjustment(Adjustment::Brightness, 200.0);
    assert_eq!(p.active_pixels().get_pixel(0, 0), Rgba([100, 100, 100, 255]));

    // per-layer originals come back with undo
    assert!(p.undo());
    assert_eq!(p.layers().active_index(), 1);
    assert_eq!(p.layers().layers()[0].pixels.get_pixel(3, 3), Rgba([120, 120, 120, 255]));
    assert!(p.select_layer(0));
    p.set_adjustment(Adjustment::Brightness, 200.0);
    assert_eq!(p.active_pixels().get_pixel(3, 3), Rgba([100, 100, 100, 255]));
}

#[test]
fn undone_collage_cannot_be_filled() {
    let mut p = project_with(PixelBuffer::new_filled(400, 400, WHITE));
    assert_eq!(p.generate_collage(2).unwrap(), 2);
    let cell = p.collage().cells()[0].clone();
    assert!(p.undo());

    assert!(p.collage().cells().is_empty());
    assert_eq!(p.collage_cell_at(cell.x as f32 + 1.0, cell.y as f32 + 1.0), None);
    let blue = PixelBuffer::new_filled(4, 4, [0, 0, 255, 255]);
    assert!(matches!(p.assign_collage_image(0, &blue), Err(EditorError::InvalidCell(0))));
    assert_eq!(p.history_labels(), vec!["Load image"]);
    assert_eq!(p.export().get_pixel(399, 399), Rgba(WHITE));

    assert!(p.redo());
    assert_eq!(p.collage().cells().len(), 2);
    p.assign_collage_image(0, &blue).unwrap();
    let (cx, cy) = (cell.x + cell.width / 2, cell.y + cell.height / 2);
    assert_eq!(p.export().get_pixel(cx, cy), Rgba([0, 0, 255, 255]));
}

#[test]
fn undoing_a_fill_keeps_earlier_fills() {
    let mut p = project_with(PixelBuffer::new_filled(400, 400, WHITE));
    p.generate_collage(2).unwrap();
    let cells = p.collage().cells().to_vec();
    p.assign_collage_image(0, &PixelBuffer::new_filled(3, 3, RED)).unwrap();
    p.assign_collage_image(1, &PixelBuffer::new_filled(3, 3, [0, 255, 0, 255])).unwrap();
    assert!(p.undo());

    assert!(p.collage().cells()[0].image.is_some());
    assert!(p.collage().cells()[1].image.is_none());
    let c = &cells[0];
    assert_eq!(p.export().get_pixel(c.x + c.width / 2, c.y + c.height / 2), Rgba(RED));
}
