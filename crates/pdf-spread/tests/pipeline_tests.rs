use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use pdf_spread::*;
use std::path::PathBuf;

fn create_test_pdf(sizes: &[(i64, i64)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");

    // Create page tree root ID
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for (index, &(width, height)) in sizes.iter().enumerate() {
        let content = format!("% page {}\nq 0 0 {} {} re S Q", index + 1, width, height);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(width),
                    Object::Integer(height),
                ]),
            ),
            ("Resources", Object::Dictionary(Dictionary::new())),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(sizes.len() as i64)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Two pages that take their MediaBox from the page tree root
fn create_inherited_box_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for _ in 0..2 {
        let content_id = doc.add_object(Stream::new(Dictionary::new(), b"q Q".to_vec()));
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(2)),
        (
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(420),
                Object::Integer(595),
            ]),
        ),
        ("Resources", Object::Dictionary(Dictionary::new())),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Three pages, the middle one with a MediaBox that is not numeric
fn create_corrupt_box_pdf() -> Vec<u8> {
    let mut doc = Document::load_mem(&create_test_pdf(&[(600, 800); 3])).unwrap();
    let middle = *doc.get_pages().get(&2).unwrap();
    doc.get_dictionary_mut(middle).unwrap().set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::string_literal("wide"),
            Object::Integer(800),
        ]),
    );

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// One 600x800 page displayed with `/Rotate`
fn create_rotated_pdf(rotate: i64) -> Vec<u8> {
    let mut doc = Document::load_mem(&create_test_pdf(&[(600, 800)])).unwrap();
    let page = *doc.get_pages().get(&1).unwrap();
    doc.get_dictionary_mut(page)
        .unwrap()
        .set("Rotate", Object::Integer(rotate));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Two pages; the first carries a web link and a link to the second page
fn create_annotated_pdf() -> Vec<u8> {
    let mut doc = Document::load_mem(&create_test_pdf(&[(600, 800); 2])).unwrap();
    let pages = doc.get_pages();
    let (first, second) = (pages[&1], pages[&2]);

    let rect = Object::Array(vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Integer(100),
        Object::Integer(20),
    ]);
    let web_link = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Annot".to_vec())),
        ("Subtype", Object::Name(b"Link".to_vec())),
        ("Rect", rect.clone()),
        ("P", Object::Reference(first)),
        (
            "A",
            Object::Dictionary(Dictionary::from_iter(vec![
                ("S", Object::Name(b"URI".to_vec())),
                ("URI", Object::string_literal("https://example.com")),
            ])),
        ),
    ]));
    let page_link = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Annot".to_vec())),
        ("Subtype", Object::Name(b"Link".to_vec())),
        ("Rect", rect),
        ("P", Object::Reference(first)),
        (
            "Dest",
            Object::Array(vec![Object::Reference(second), Object::Name(b"Fit".to_vec())]),
        ),
    ]));

    doc.get_dictionary_mut(first).unwrap().set(
        "Annots",
        Object::Array(vec![Object::Reference(web_link), Object::Reference(page_link)]),
    );

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn first_page(doc: &Document) -> ObjectId {
    *doc.get_pages().values().next().unwrap()
}

/// Page content of a unit as text
fn content_of(unit: &PageUnit) -> String {
    let doc = unit.open().unwrap();
    String::from_utf8(doc.get_page_content(first_page(&doc)).unwrap()).unwrap()
}

fn number(obj: &Object) -> f32 {
    match obj {
        Object::Integer(i) => *i as f32,
        Object::Real(r) => *r,
        other => panic!("Expected a number, got {:?}", other),
    }
}

/// Form matrix of the first layer drawn on a unit's page
fn layer_matrix(unit: &PageUnit) -> Option<Vec<f32>> {
    let doc = unit.open().unwrap();
    let page = doc.get_dictionary(first_page(&doc)).unwrap();
    let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
    let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
    let layer_id = xobjects.get(b"L0").unwrap().as_reference().unwrap();
    let layer = doc.get_object(layer_id).unwrap().as_stream().unwrap();

    layer
        .dict
        .get(b"Matrix")
        .ok()
        .map(|m| m.as_array().unwrap().iter().map(number).collect())
}

fn size_of(unit: &PageUnit) -> (f32, f32) {
    let rect = unit.rect().unwrap();
    (rect.width, rect.height)
}

fn rects(pipeline: &Pipeline) -> Vec<(f32, f32)> {
    pipeline
        .page_rects()
        .into_iter()
        .map(|rect| {
            let rect = rect.unwrap();
            (rect.width, rect.height)
        })
        .collect()
}

fn assert_size(actual: (f32, f32), expected: (f32, f32)) {
    assert!(
        (actual.0 - expected.0).abs() < 0.01 && (actual.1 - expected.1).abs() < 0.01,
        "expected {:?}, got {:?}",
        expected,
        actual
    );
}

fn bytes_of(pipeline: &Pipeline) -> Vec<Vec<u8>> {
    pipeline
        .units()
        .iter()
        .map(|unit| unit.bytes().unwrap())
        .collect()
}

fn info_string(doc: &Document, key: &[u8]) -> (Vec<u8>, lopdf::StringFormat) {
    let info_id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
    match doc.get_dictionary(info_id).unwrap().get(key).unwrap() {
        Object::String(bytes, format) => (bytes.clone(), *format),
        other => panic!("Expected a string, got {:?}", other),
    }
}

// =============================================================================
// Loading
// =============================================================================

#[tokio::test]
async fn test_load_splits_into_units() {
    let bytes = create_test_pdf(&[(600, 800), (800, 600), (300, 400)]);
    let pipeline = Pipeline::load_mem(bytes).await.unwrap();

    assert_eq!(pipeline.len(), 3);
    let sizes = rects(&pipeline);
    assert_size(sizes[0], (600.0, 800.0));
    assert_size(sizes[1], (800.0, 600.0));
    assert_size(sizes[2], (300.0, 400.0));

    for unit in pipeline.units() {
        assert_eq!(unit.open().unwrap().get_pages().len(), 1);
        assert!(unit.path().exists());
    }
}

#[tokio::test]
async fn test_load_from_reader() {
    let bytes = create_test_pdf(&[(612, 792); 4]);
    let pipeline = Pipeline::load(&mut bytes.as_slice()).await.unwrap();
    assert_eq!(pipeline.len(), 4);
}

#[tokio::test]
async fn test_load_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.pdf");
    std::fs::write(&path, create_test_pdf(&[(612, 792); 2])).unwrap();

    let pipeline = Pipeline::load_path(&path).await.unwrap();
    assert_eq!(pipeline.len(), 2);
}

#[tokio::test]
async fn test_load_resolves_inherited_media_box() {
    let pipeline = Pipeline::load_mem(create_inherited_box_pdf()).await.unwrap();

    assert_eq!(pipeline.len(), 2);
    for size in rects(&pipeline) {
        assert_size(size, (420.0, 595.0));
    }
}

#[tokio::test]
async fn test_load_rejects_garbage() {
    let result = Pipeline::load_mem(b"this is not a pdf".to_vec()).await;
    assert!(matches!(result, Err(SpreadError::Decode(_))));
}

#[tokio::test]
async fn test_dropping_pipeline_deletes_unit_files() {
    let pipeline = Pipeline::load_mem(create_test_pdf(&[(612, 792); 2]))
        .await
        .unwrap();
    let paths: Vec<_> = pipeline
        .units()
        .iter()
        .map(|unit| unit.path().to_path_buf())
        .collect();

    drop(pipeline);
    for path in paths {
        assert!(!path.exists(), "{} was not removed", path.display());
    }
}

// =============================================================================
// Rotate
// =============================================================================

#[tokio::test]
async fn test_rotate_to_portrait_turns_only_landscape_pages() {
    let bytes = create_test_pdf(&[(600, 800), (800, 600), (600, 800)]);
    let pipeline = Pipeline::load_mem(bytes).await.unwrap();
    let before = bytes_of(&pipeline);

    let pipeline = pipeline
        .rotate(Orientation::Portrait, TurnDirection::Left)
        .await;

    assert!(pipeline.failures().is_empty());
    for size in rects(&pipeline) {
        assert_size(size, (600.0, 800.0));
    }

    let after = bytes_of(&pipeline);
    assert_eq!(before[0], after[0]);
    assert_ne!(before[1], after[1]);
    assert_eq!(before[2], after[2]);
}

#[tokio::test]
async fn test_rotate_to_landscape() {
    let bytes = create_test_pdf(&[(600, 800), (800, 600)]);
    let pipeline = Pipeline::load_mem(bytes)
        .await
        .unwrap()
        .rotate(Orientation::Landscape, TurnDirection::Right)
        .await;

    let sizes = rects(&pipeline);
    assert_size(sizes[0], (800.0, 600.0));
    assert_size(sizes[1], (800.0, 600.0));
}

#[tokio::test]
async fn test_rotate_square_page_is_left_alone() {
    let bytes = create_test_pdf(&[(500, 500)]);
    let pipeline = Pipeline::load_mem(bytes).await.unwrap();
    let before = bytes_of(&pipeline);

    let pipeline = pipeline
        .rotate(Orientation::Landscape, TurnDirection::Left)
        .await;
    assert_eq!(before, bytes_of(&pipeline));
}

#[tokio::test]
async fn test_rotate_records_corrupt_page_and_continues() {
    let pipeline = Pipeline::load_mem(create_corrupt_box_pdf()).await.unwrap();
    let before = bytes_of(&pipeline);

    let pipeline = pipeline
        .rotate(Orientation::Landscape, TurnDirection::Left)
        .await;

    assert_eq!(pipeline.len(), 3);
    let failures = pipeline.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].index, 1);
    assert_eq!(failures[0].stage, Stage::Rotate);
    assert!(matches!(failures[0].error, SpreadError::CorruptPage(_)));

    // The failed page kept its content, the others were turned
    let after = bytes_of(&pipeline);
    assert_eq!(before[1], after[1]);
    assert_size(size_of(&pipeline.units()[0]), (800.0, 600.0));
    assert_size(size_of(&pipeline.units()[2]), (800.0, 600.0));

    // The corrupt page still builds
    let built = pipeline.build_to_vec().await.unwrap();
    assert_eq!(Document::load_mem(&built).unwrap().get_pages().len(), 3);
}

// =============================================================================
// Resize
// =============================================================================

#[tokio::test]
async fn test_resize_fits_every_page() {
    let bytes = create_test_pdf(&[(600, 800), (800, 600), (1000, 250)]);
    let pipeline = Pipeline::load_mem(bytes)
        .await
        .unwrap()
        .resize(PageRect::new(400.0, 400.0))
        .await;

    assert!(pipeline.failures().is_empty());
    for size in rects(&pipeline) {
        assert_size(size, (400.0, 400.0));
    }
}

#[tokio::test]
async fn test_resize_follows_page_orientation() {
    let bytes = create_test_pdf(&[(600, 800), (800, 600)]);
    let pipeline = Pipeline::load_mem(bytes)
        .await
        .unwrap()
        .resize(PageRect::new(300.0, 500.0))
        .await;

    let sizes = rects(&pipeline);
    assert_size(sizes[0], (300.0, 500.0));
    assert_size(sizes[1], (500.0, 300.0));
}

#[tokio::test]
async fn test_resize_to_same_size_is_noop() {
    let pipeline = Pipeline::load_mem(create_test_pdf(&[(612, 792); 3]))
        .await
        .unwrap();
    let before = bytes_of(&pipeline);

    let pipeline = pipeline.resize(PageRect::new(612.0, 792.0)).await;
    assert!(pipeline.failures().is_empty());
    assert_eq!(before, bytes_of(&pipeline));
}

#[tokio::test]
async fn test_resize_to_paper_size() {
    let pipeline = Pipeline::load_mem(create_test_pdf(&[(612, 792)]))
        .await
        .unwrap()
        .resize(PaperSize::A4.to_rect())
        .await;

    let a4 = PaperSize::A4.to_rect();
    assert_size(rects(&pipeline)[0], (a4.width, a4.height));
}

#[tokio::test]
async fn test_resize_with_single_worker() {
    let pipeline = Pipeline::load_mem(create_test_pdf(&[(600, 800); 5]))
        .await
        .unwrap()
        .with_parallelism(1)
        .resize(PageRect::new(300.0, 400.0))
        .await;

    assert_eq!(pipeline.len(), 5);
    for size in rects(&pipeline) {
        assert_size(size, (300.0, 400.0));
    }
}

// =============================================================================
// Combine
// =============================================================================

#[tokio::test]
async fn test_combine_even_count() {
    let pipeline = Pipeline::load_mem(create_test_pdf(&[(600, 800); 4]))
        .await
        .unwrap()
        .combine(TurnDirection::Left)
        .await
        .unwrap();

    assert_eq!(pipeline.len(), 2);
    for size in rects(&pipeline) {
        assert_size(size, (1200.0, 800.0));
    }
}

#[tokio::test]
async fn test_combine_odd_count_passes_last_page_through() {
    let pipeline = Pipeline::load_mem(create_test_pdf(&[(600, 800), (600, 800), (300, 500)]))
        .await
        .unwrap();
    let last_path = pipeline.units()[2].path().to_path_buf();
    let last_bytes = pipeline.units()[2].bytes().unwrap();

    let pipeline = pipeline.combine(TurnDirection::Left).await.unwrap();

    assert_eq!(pipeline.len(), 2);
    let sizes = rects(&pipeline);
    assert_size(sizes[0], (1200.0, 800.0));
    assert_size(sizes[1], (300.0, 500.0));
    assert_eq!(pipeline.units()[1].path(), last_path.as_path());
    assert_eq!(pipeline.units()[1].bytes().unwrap(), last_bytes);
}

#[tokio::test]
async fn test_combine_single_page() {
    let pipeline = Pipeline::load_mem(create_test_pdf(&[(800, 600)]))
        .await
        .unwrap()
        .combine(TurnDirection::Left)
        .await
        .unwrap();

    assert_eq!(pipeline.len(), 1);
    assert_size(rects(&pipeline)[0], (800.0, 600.0));
}

#[tokio::test]
async fn test_combine_turns_landscape_pages_upright() {
    let pipeline = Pipeline::load_mem(create_test_pdf(&[(800, 600), (800, 600)]))
        .await
        .unwrap()
        .combine(TurnDirection::Right)
        .await
        .unwrap();

    assert_eq!(pipeline.len(), 1);
    assert!(pipeline.failures().is_empty());
    assert_size(rects(&pipeline)[0], (1200.0, 800.0));
}

#[tokio::test]
async fn test_combine_fits_right_page_to_left() {
    let pipeline = Pipeline::load_mem(create_test_pdf(&[(600, 800), (300, 300)]))
        .await
        .unwrap()
        .combine(TurnDirection::Left)
        .await
        .unwrap();

    // The spread is sized from the left page only
    assert_size(rects(&pipeline)[0], (1200.0, 800.0));
}

#[tokio::test]
async fn test_combine_empty_pipeline() {
    let pipeline = Pipeline::empty()
        .combine(TurnDirection::Left)
        .await
        .unwrap();
    assert!(pipeline.is_empty());
}

#[tokio::test]
async fn test_combine_fails_on_unreadable_left_page() {
    let pipeline = Pipeline::load_mem(create_corrupt_box_pdf()).await.unwrap();
    // Pair the corrupt page on the left
    let pipeline = Pipeline::load_mem(create_test_pdf(&[(600, 800)]))
        .await
        .unwrap()
        .append(pipeline);

    let result = pipeline.combine(TurnDirection::Left).await;
    assert!(matches!(
        result,
        Err(CombineError {
            error: SpreadError::CorruptPage(_),
            ..
        })
    ));
}

#[tokio::test]
async fn test_failed_combine_returns_pipeline_intact() {
    let corrupt = Pipeline::load_mem(create_corrupt_box_pdf()).await.unwrap();
    // Pairs: (landscape, portrait), (portrait, corrupt); the last page is odd
    let pipeline = Pipeline::load_mem(create_test_pdf(&[(800, 600), (600, 800)]))
        .await
        .unwrap()
        .append(corrupt);
    let paths: Vec<PathBuf> = pipeline
        .units()
        .iter()
        .map(|unit| unit.path().to_path_buf())
        .collect();
    let before = bytes_of(&pipeline);

    let err = pipeline.combine(TurnDirection::Left).await.unwrap_err();
    assert!(matches!(err.error, SpreadError::Embed(_)));

    // Every unit survives, untouched, including the landscape page of the good pair
    let pipeline = err.pipeline;
    assert_eq!(pipeline.len(), 5);
    for (unit, path) in pipeline.units().iter().zip(&paths) {
        assert_eq!(unit.path(), path.as_path());
        assert!(path.exists());
    }
    assert_eq!(before, bytes_of(&pipeline));

    let built = pipeline.build_to_vec().await.unwrap();
    assert_eq!(Document::load_mem(&built).unwrap().get_pages().len(), 5);
}

#[tokio::test]
async fn test_combine_replaces_units_with_spreads() {
    let pipeline = Pipeline::load_mem(create_test_pdf(&[(800, 600), (300, 300)]))
        .await
        .unwrap();
    let inputs: Vec<PathBuf> = pipeline
        .units()
        .iter()
        .map(|unit| unit.path().to_path_buf())
        .collect();

    let combined = pipeline.combine(TurnDirection::Left).await.unwrap();
    assert_eq!(combined.len(), 1);
    assert_size(rects(&combined)[0], (1200.0, 800.0));
    assert!(!inputs.contains(&combined.units()[0].path().to_path_buf()));
    // The consumed inputs are deleted with their units
    for path in inputs {
        assert!(!path.exists());
    }
}

// =============================================================================
// Drawn content
// =============================================================================

#[tokio::test]
async fn test_rotate_draws_quarter_turn() {
    let pipeline = Pipeline::load_mem(create_test_pdf(&[(600, 800), (800, 600)]))
        .await
        .unwrap()
        .rotate(Orientation::Portrait, TurnDirection::Left)
        .await;

    assert_eq!(
        content_of(&pipeline.units()[1]),
        "q 0 1 -1 0 600 0 cm /L0 Do Q\n"
    );
    assert!(layer_matrix(&pipeline.units()[1]).is_none());
}

#[tokio::test]
async fn test_rotate_right_draws_clockwise_turn() {
    let pipeline = Pipeline::load_mem(create_test_pdf(&[(800, 600)]))
        .await
        .unwrap()
        .rotate(Orientation::Portrait, TurnDirection::Right)
        .await;

    assert_eq!(
        content_of(&pipeline.units()[0]),
        "q 0 -1 1 0 0 800 cm /L0 Do Q\n"
    );
}

#[tokio::test]
async fn test_resize_draws_centred_scale() {
    let pipeline = Pipeline::load_mem(create_test_pdf(&[(600, 800)]))
        .await
        .unwrap()
        .resize(PageRect::new(400.0, 400.0))
        .await;

    assert_eq!(
        content_of(&pipeline.units()[0]),
        "q 0.5 0 0 0.5 50 0 cm /L0 Do Q\n"
    );
}

#[tokio::test]
async fn test_combine_draws_pages_side_by_side() {
    let pipeline = Pipeline::load_mem(create_test_pdf(&[(600, 800); 2]))
        .await
        .unwrap()
        .combine(TurnDirection::Left)
        .await
        .unwrap();

    assert_eq!(
        content_of(&pipeline.units()[0]),
        "q 1 0 0 1 0 0 cm /L0 Do Q\nq 1 0 0 1 600 0 cm /L1 Do Q\n"
    );
}

#[tokio::test]
async fn test_layer_keeps_source_content() {
    let pipeline = Pipeline::load_mem(create_test_pdf(&[(800, 600)]))
        .await
        .unwrap()
        .rotate(Orientation::Portrait, TurnDirection::Left)
        .await;

    let doc = pipeline.units()[0].open().unwrap();
    let page = doc.get_dictionary(first_page(&doc)).unwrap();
    let xobjects = page
        .get(b"Resources")
        .and_then(Object::as_dict)
        .and_then(|resources| resources.get(b"XObject"))
        .and_then(Object::as_dict)
        .unwrap();
    let layer_id = xobjects.get(b"L0").unwrap().as_reference().unwrap();
    let layer = doc.get_object(layer_id).unwrap().as_stream().unwrap();

    let content = String::from_utf8(layer.decompressed_content().unwrap_or(layer.content.clone()))
        .unwrap();
    assert!(content.contains("% page 1"));
}

// =============================================================================
// Page rotation
// =============================================================================

#[tokio::test]
async fn test_rotated_page_reports_displayed_size() {
    let pipeline = Pipeline::load_mem(create_rotated_pdf(90)).await.unwrap();
    assert_size(rects(&pipeline)[0], (800.0, 600.0));

    let pipeline = Pipeline::load_mem(create_rotated_pdf(180)).await.unwrap();
    assert_size(rects(&pipeline)[0], (600.0, 800.0));

    let pipeline = Pipeline::load_mem(create_rotated_pdf(-90)).await.unwrap();
    assert_size(rects(&pipeline)[0], (800.0, 600.0));
}

#[tokio::test]
async fn test_rotated_page_already_landscape_is_left_alone() {
    let pipeline = Pipeline::load_mem(create_rotated_pdf(90)).await.unwrap();
    let before = bytes_of(&pipeline);

    let pipeline = pipeline
        .rotate(Orientation::Landscape, TurnDirection::Left)
        .await;
    assert_eq!(before, bytes_of(&pipeline));
}

#[tokio::test]
async fn test_resize_keeps_displayed_orientation() {
    let pipeline = Pipeline::load_mem(create_rotated_pdf(90))
        .await
        .unwrap()
        .resize(PageRect::new(300.0, 500.0))
        .await;

    let unit = &pipeline.units()[0];
    assert_size(size_of(unit), (500.0, 300.0));
    assert_eq!(content_of(unit), "q 0.5 0 0 0.5 50 0 cm /L0 Do Q\n");

    // The page turn moved into the layer, the new page has none of its own
    assert_eq!(
        layer_matrix(unit).unwrap(),
        vec![0.0, -1.0, 1.0, 0.0, 0.0, 600.0]
    );
    let doc = unit.open().unwrap();
    assert!(doc.get_dictionary(first_page(&doc)).unwrap().get(b"Rotate").is_err());
}

#[tokio::test]
async fn test_combine_turns_rotated_page_upright() {
    let rotated = Pipeline::load_mem(create_rotated_pdf(90)).await.unwrap();
    let pipeline = Pipeline::load_mem(create_test_pdf(&[(600, 800)]))
        .await
        .unwrap()
        .append(rotated)
        .combine(TurnDirection::Left)
        .await
        .unwrap();

    assert!(pipeline.failures().is_empty());
    assert_size(rects(&pipeline)[0], (1200.0, 800.0));
}

#[tokio::test]
async fn test_build_keeps_page_rotation() {
    let pipeline = Pipeline::load_mem(create_rotated_pdf(90)).await.unwrap();
    let built = pipeline.build_to_vec().await.unwrap();

    let doc = Document::load_mem(&built).unwrap();
    let page = doc.get_dictionary(first_page(&doc)).unwrap();
    assert_eq!(page.get(b"Rotate").unwrap().as_i64().unwrap(), 90);
}

// =============================================================================
// Annotations
// =============================================================================

#[tokio::test]
async fn test_build_keeps_annotations_of_untouched_pages() {
    let pipeline = Pipeline::load_mem(create_annotated_pdf()).await.unwrap();
    let built = pipeline.build_to_vec().await.unwrap();

    let doc = Document::load_mem(&built).unwrap();
    let page_id = first_page(&doc);
    let annots = doc
        .get_dictionary(page_id)
        .unwrap()
        .get(b"Annots")
        .unwrap()
        .as_array()
        .unwrap();

    // The link to another page has no target in a single page and is dropped
    assert_eq!(annots.len(), 1);
    let link = doc
        .get_dictionary(annots[0].as_reference().unwrap())
        .unwrap();
    assert_eq!(link.get(b"P").unwrap().as_reference().unwrap(), page_id);

    let action = link.get(b"A").unwrap().as_dict().unwrap();
    match action.get(b"URI").unwrap() {
        Object::String(uri, _) => assert_eq!(uri, b"https://example.com"),
        other => panic!("Expected a string, got {:?}", other),
    }
}

#[tokio::test]
async fn test_redrawn_page_drops_annotations() {
    let pipeline = Pipeline::load_mem(create_annotated_pdf())
        .await
        .unwrap()
        .rotate(Orientation::Landscape, TurnDirection::Left)
        .await;

    let doc = pipeline.units()[0].open().unwrap();
    let page = doc.get_dictionary(first_page(&doc)).unwrap();
    assert!(page.get(b"Annots").is_err());
}

// =============================================================================
// Build
// =============================================================================

#[tokio::test]
async fn test_build_round_trip_keeps_order() {
    let sizes = [(100, 200), (300, 400), (500, 600)];
    let pipeline = Pipeline::load_mem(create_test_pdf(&sizes)).await.unwrap();

    let mut built = Vec::new();
    pipeline.build(&mut built).await.unwrap();

    let reloaded = Pipeline::load_mem(built).await.unwrap();
    assert_eq!(reloaded.len(), 3);
    for (actual, &(w, h)) in rects(&reloaded).into_iter().zip(sizes.iter()) {
        assert_size(actual, (w as f32, h as f32));
    }
}

#[tokio::test]
async fn test_build_after_all_stages() {
    let pipeline = Pipeline::load_mem(create_test_pdf(&[(600, 800), (800, 600), (600, 800)]))
        .await
        .unwrap()
        .rotate(Orientation::Portrait, TurnDirection::Left)
        .await
        .resize(PageRect::new(300.0, 400.0))
        .await
        .combine(TurnDirection::Left)
        .await
        .unwrap();

    let built = pipeline.build_to_vec().await.unwrap();
    let reloaded = Pipeline::load_mem(built).await.unwrap();

    let sizes = rects(&reloaded);
    assert_eq!(sizes.len(), 2);
    assert_size(sizes[0], (600.0, 400.0));
    assert_size(sizes[1], (300.0, 400.0));
}

#[tokio::test]
async fn test_build_writes_metadata() {
    let pipeline = Pipeline::load_mem(create_test_pdf(&[(612, 792)]))
        .await
        .unwrap()
        .with_author("Ada Lovelace")
        .with_creator("Zoë");

    let doc = Document::load_mem(&pipeline.build_to_vec().await.unwrap()).unwrap();

    assert_eq!(info_string(&doc, b"Author").0, b"Ada Lovelace".to_vec());
    assert_eq!(info_string(&doc, b"Producer").0, b"pdf-spread".to_vec());

    let (creator, format) = info_string(&doc, b"Creator");
    assert_eq!(format, lopdf::StringFormat::Hexadecimal);
    assert_eq!(&creator[..2], &[0xFE, 0xFF]);
    assert_eq!(&creator[2..], &[0x00, b'Z', 0x00, b'o', 0x00, 0xEB]);
}

#[tokio::test]
async fn test_build_default_metadata() {
    let pipeline = Pipeline::load_mem(create_test_pdf(&[(612, 792)]))
        .await
        .unwrap();
    let doc = Document::load_mem(&pipeline.build_to_vec().await.unwrap()).unwrap();

    assert_eq!(info_string(&doc, b"Author").0, Vec::<u8>::new());
    assert_eq!(info_string(&doc, b"Creator").0, b"pdf-spread".to_vec());
}

#[tokio::test]
async fn test_build_empty_pipeline_fails() {
    let result = Pipeline::empty().build_to_vec().await;
    assert!(matches!(result, Err(SpreadError::NoPages)));
}

#[tokio::test]
async fn test_build_fails_when_unit_is_missing() {
    let pipeline = Pipeline::load_mem(create_test_pdf(&[(612, 792); 2]))
        .await
        .unwrap();
    std::fs::remove_file(pipeline.units()[1].path()).unwrap();

    let result = pipeline.build_to_vec().await;
    assert!(matches!(result, Err(SpreadError::Merge(_))));
}

#[tokio::test]
async fn test_save_to_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("output.pdf");

    let pipeline = Pipeline::load_mem(create_test_pdf(&[(612, 792); 3]))
        .await
        .unwrap();
    pipeline.save(&path).await.unwrap();

    let doc = Document::load(&path).unwrap();
    assert_eq!(doc.get_pages().len(), 3);
}

// =============================================================================
// Append and run
// =============================================================================

#[tokio::test]
async fn test_append_concatenates_and_keeps_receiver_metadata() {
    let first = Pipeline::load_mem(create_test_pdf(&[(100, 100), (200, 200)]))
        .await
        .unwrap()
        .with_author("first");
    let second = Pipeline::load_mem(create_test_pdf(&[(300, 300)]))
        .await
        .unwrap()
        .with_author("second");

    let joined = first.append(second);
    assert_eq!(joined.len(), 3);
    assert_eq!(joined.info().author, "first");

    let sizes = rects(&joined);
    assert_size(sizes[0], (100.0, 100.0));
    assert_size(sizes[2], (300.0, 300.0));
}

#[tokio::test]
async fn test_append_offsets_failure_indices() {
    let first = Pipeline::load_mem(create_test_pdf(&[(600, 800); 2]))
        .await
        .unwrap();
    let second = Pipeline::load_mem(create_corrupt_box_pdf())
        .await
        .unwrap()
        .rotate(Orientation::Portrait, TurnDirection::Left)
        .await;
    assert_eq!(second.failures()[0].index, 1);

    let mut joined = first.append(second);
    let failures = joined.take_failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].index, 3);
    assert!(joined.failures().is_empty());
}

#[tokio::test]
async fn test_run_matches_statistics() {
    let options = SpreadOptions {
        rotate: Some(RotateStep {
            orientation: Orientation::Portrait,
            direction: TurnDirection::Left,
        }),
        resize: Some(PaperSize::A5),
        combine: Some(TurnDirection::Left),
        parallelism: 2,
        ..Default::default()
    };

    let sizes = [(600, 800), (800, 600), (600, 800), (600, 800), (612, 792)];
    let pipeline = Pipeline::load_mem(create_test_pdf(&sizes))
        .await
        .unwrap()
        .run(&options)
        .await
        .unwrap();

    let stats = calculate_statistics(sizes.len(), &options).unwrap();
    assert_eq!(pipeline.len(), stats.output_pages);
    assert!(pipeline.failures().is_empty());

    let a5 = stats.target_rect.unwrap();
    let out = rects(&pipeline);
    assert_size(out[0], (a5.width * 2.0, a5.height));
    assert_size(out[2], (a5.width, a5.height));
}

#[tokio::test]
async fn test_run_rejects_invalid_options() {
    let options = SpreadOptions {
        parallelism: 0,
        ..Default::default()
    };
    let pipeline = Pipeline::load_mem(create_test_pdf(&[(612, 792)]))
        .await
        .unwrap();

    let result = pipeline.run(&options).await;
    assert!(matches!(result, Err(SpreadError::Config(_))));
}
