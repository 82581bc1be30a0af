use image::{Rgba, RgbaImage};

use rasterpad::io::{decode_png, encode_png};
use rasterpad::{Cursor, Editor, EditorParams, GestureOutcome, PointerInput, StateEntry, ToolKind};

const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

fn at(x: f32, y: f32) -> PointerInput {
    PointerInput::new(x, y)
}

/// 80x80 editor whose first layer holds a red square covering [10, 50) and
/// whose second layer is empty.
fn editor_with_red_square() -> Editor {
    let mut img = RgbaImage::new(80, 80);
    for y in 10..50 {
        for x in 10..50 {
            img.put_pixel(x, y, RED);
        }
    }
    let entries = vec![
        StateEntry::Background { color: "#FFFFFF".into() },
        StateEntry::Raster { data: encode_png(&img).unwrap() },
        StateEntry::Raster { data: encode_png(&RgbaImage::new(80, 80)).unwrap() },
    ];
    let mut editor = Editor::from_state(EditorParams::with_size(80, 80), &entries).unwrap();
    editor.activate_layer(1).unwrap();
    editor
}

fn pixel(editor: &Editor, layer: usize, x: i32, y: i32) -> Rgba<u8> {
    editor.layers().get(layer).unwrap().surface().unwrap().pixel(x, y)
}

#[test]
fn switching_tools_mid_move_commits_lifted_pixels() {
    let mut e = editor_with_red_square();
    e.activate_tool(ToolKind::Marquee);

    e.pointer_down(at(10.0, 10.0));
    e.pointer_move(at(50.0, 50.0));
    e.pointer_up(at(50.0, 50.0));

    e.pointer_down(at(30.0, 30.0));
    e.pointer_move(at(40.0, 40.0));
    assert_eq!(pixel(&e, 1, 15, 15)[3], 0);

    e.activate_tool(ToolKind::Brush);

    assert_eq!(pixel(&e, 1, 55, 55), RED);
    assert_eq!(pixel(&e, 1, 15, 15)[3], 0);
    assert!(e.overlays().selection_content.is_blank());
    assert!(e.overlays().selection_outline.is_blank());
    assert_eq!(e.pointer_up(at(40.0, 40.0)), GestureOutcome::Ignored);
}

#[test]
fn activating_another_layer_commits_onto_the_old_one() {
    let mut e = editor_with_red_square();
    e.activate_tool(ToolKind::Marquee);
    e.pointer_down(at(10.0, 10.0));
    e.pointer_move(at(50.0, 50.0));
    e.pointer_up(at(50.0, 50.0));
    e.pointer_down(at(20.0, 20.0));
    e.pointer_move(at(25.0, 20.0));
    e.pointer_up(at(25.0, 20.0));

    e.activate_layer(2).unwrap();

    assert_eq!(pixel(&e, 1, 52, 20), RED);
    assert_eq!(pixel(&e, 1, 12, 20)[3], 0);
    assert!(e.layers().get(2).unwrap().surface().unwrap().is_blank());
}

#[test]
fn locked_layer_rejects_drawing() {
    let mut e = Editor::new(EditorParams::with_size(64, 64));
    e.lock_layer(1).unwrap();

    assert_eq!(e.pointer_down(at(10.0, 10.0)), GestureOutcome::Rejected);
    assert_eq!(e.cursor(), Cursor::NotAllowed);
    assert_eq!(e.pointer_move(at(20.0, 20.0)), GestureOutcome::Ignored);
    assert_eq!(e.pointer_up(at(20.0, 20.0)), GestureOutcome::Rejected);
    assert_eq!(e.cursor(), Cursor::Crosshair);
    assert!(e.layers().get(1).unwrap().surface().unwrap().is_blank());
    assert!(!e.delete_layer(1).unwrap());

    e.unlock_layer(1).unwrap();
    assert_eq!(e.pointer_down(at(10.0, 10.0)), GestureOutcome::Accepted);
}

#[test]
fn grid_snap_applies_to_line_endpoints() {
    let mut e = Editor::new(EditorParams::with_size(100, 100));
    e.toggle("grid", Some(true)).unwrap();
    e.activate_tool(ToolKind::Line);

    e.pointer_down(at(9.0, 11.0));
    e.pointer_move(at(51.0, 19.0));
    e.pointer_up(at(51.0, 19.0));

    let last = e.dispatcher().last_event().unwrap();
    assert_eq!((last.pos.x, last.pos.y), (60.0, 20.0));
    assert_eq!(pixel(&e, 1, 30, 19)[3], 255);
    assert_eq!(pixel(&e, 1, 30, 20)[3], 255);
    assert_eq!(pixel(&e, 1, 30, 11)[3], 0);
    assert!(e.overlays().scratch.is_blank());
}

#[test]
fn eraser_removes_paint_through_the_editor() {
    let mut e = editor_with_red_square();
    e.activate_tool(ToolKind::Eraser);
    e.toggle("grid", Some(true)).unwrap();
    e.pointer_down(at(30.0, 30.0));
    e.pointer_up(at(30.0, 30.0));

    assert_eq!(pixel(&e, 1, 30, 30)[3], 0);
    assert_eq!(pixel(&e, 1, 12, 12), RED);
}

#[test]
fn state_export_starts_with_the_composite() {
    let e = editor_with_red_square();
    let mut result = None;
    e.get_state(|r| result = Some(r));
    let entries = result.unwrap().unwrap();

    assert_eq!(entries.len(), 4);
    let StateEntry::Composite { data } = &entries[0] else { panic!("composite first") };
    let composite = decode_png(data).unwrap();
    assert_eq!(*composite.get_pixel(20, 20), RED);
    assert_eq!(*composite.get_pixel(70, 70), Rgba([255, 255, 255, 255]));
    assert_eq!(entries[1], StateEntry::Background { color: "#FFFFFF".into() });
    assert!(matches!(entries[2], StateEntry::Raster { .. }));
    assert!(matches!(entries[3], StateEntry::Raster { .. }));
}

#[test]
fn save_and_open_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("drawing.rps");

    let mut e = editor_with_red_square();
    e.set_background_color(rasterpad::Swatch([10, 20, 30]));
    e.save(&path).unwrap();

    let reopened = Editor::open(EditorParams::default(), &path).unwrap();
    assert_eq!((reopened.params().width, reopened.params().height), (80, 80));
    assert_eq!(reopened.layers().indices(), vec![0, 1, 2]);
    assert_eq!(reopened.layers().active_index(), Some(2));
    assert_eq!(reopened.layers().background_color(), rasterpad::Swatch([10, 20, 30]));
    assert_eq!(pixel(&reopened, 1, 20, 20), RED);
    assert_ne!(reopened.id(), e.id());
}

#[test]
fn mismatched_layer_size_is_rejected() {
    let entries = vec![StateEntry::Raster { data: encode_png(&RgbaImage::new(4, 4)).unwrap() }];
    assert!(Editor::from_state(EditorParams::with_size(8, 8), &entries).is_err());
}

#[test]
fn deleting_an_inactive_layer_commits_lifted_pixels_first() {
    let mut img = RgbaImage::new(64, 64);
    img.put_pixel(20, 20, RED);
    let entries = vec![
        StateEntry::Background { color: "#FFFFFF".into() },
        StateEntry::Raster { data: encode_png(&img).unwrap() },
        StateEntry::Raster { data: encode_png(&RgbaImage::new(64, 64)).unwrap() },
        StateEntry::Raster { data: encode_png(&RgbaImage::new(64, 64)).unwrap() },
    ];
    let mut e = Editor::from_state(EditorParams::with_size(64, 64), &entries).unwrap();
    e.activate_layer(1).unwrap();
    e.activate_tool(ToolKind::Marquee);
    e.pointer_down(at(5.0, 5.0));
    e.pointer_move(at(40.0, 40.0));
    e.pointer_up(at(40.0, 40.0));
    e.pointer_down(at(20.0, 20.0));
    assert_eq!(pixel(&e, 1, 20, 20)[3], 0);

    assert!(e.delete_layer(2).unwrap());
    assert_eq!(e.layers().active_index(), Some(3));
    e.activate_tool(ToolKind::Brush);

    assert_eq!(pixel(&e, 1, 20, 20), RED);
    assert!(e.layers().get(3).unwrap().surface().unwrap().is_blank());
    assert!(e.overlays().selection_content.is_blank());
}

#[test]
fn export_includes_pixels_lifted_by_the_marquee() {
    let mut e = editor_with_red_square();
    e.activate_tool(ToolKind::Marquee);
    e.pointer_down(at(10.0, 10.0));
    e.pointer_move(at(50.0, 50.0));
    e.pointer_up(at(50.0, 50.0));
    e.pointer_down(at(30.0, 30.0));
    assert_eq!(pixel(&e, 1, 15, 15)[3], 0);
    assert_eq!(e.overlays().selection_content.pixel(15, 15), RED);

    let entries = e.state().unwrap();
    let StateEntry::Composite { data } = &entries[0] else { panic!("composite first") };
    assert_eq!(*decode_png(data).unwrap().get_pixel(15, 15), RED);
    let StateEntry::Raster { data } = &entries[2] else { panic!("first raster layer") };
    assert_eq!(*decode_png(data).unwrap().get_pixel(15, 15), RED);
    // The live layer still holds the hole until the selection commits.
    assert_eq!(pixel(&e, 1, 15, 15)[3], 0);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lifted.rps");
    e.save(&path).unwrap();
    let reopened = Editor::open(EditorParams::default(), &path).unwrap();
    assert_eq!(pixel(&reopened, 1, 15, 15), RED);
}
