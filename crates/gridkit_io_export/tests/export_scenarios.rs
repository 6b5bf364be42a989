use gridkit_io_export::{
    EnumCellValue, EnumExportCell, EnumFieldType, GridExportPipeline, InMemoryRowSource,
    SpecColumn, SpecExcelExportOptions, SpecGridOptions, SpecGrouping, SpecMergeRange,
    XlsxModelWriter,
};
use serde_json::{Value, json};

fn derive_columns(value: Value) -> Vec<SpecColumn> {
    serde_json::from_value(value).unwrap()
}

fn derive_number_style_id(result: &gridkit_io_export::SpecExportResult) -> u32 {
    result
        .styles
        .iter()
        .find(|style| style.format.num_format.as_deref() == Some("0"))
        .map(|style| style.id)
        .unwrap()
}

#[test]
fn scenario_excluded_column_and_number_style() {
    let columns = derive_columns(json!([
        {"id": "id", "excludeFromExport": true},
        {"id": "userId", "field": "userId"},
        {"id": "order", "field": "order", "type": "number"}
    ]));
    let rows = InMemoryRowSource::new(vec![json!({"id": 0, "userId": "1E06", "order": 10})]);

    let result = GridExportPipeline::default()
        .run(&columns, &rows, &SpecExcelExportOptions::default())
        .unwrap();

    let n_number_style = derive_number_style_id(&result);
    assert_eq!(result.model.rows.len(), 2);
    assert_eq!(
        serde_json::to_value(&result.model.rows[1]).unwrap(),
        json!(["1E06", {"value": 10, "metadata": {"style": n_number_style}}])
    );
}

#[test]
fn scenario_date_iso_formatting() {
    let columns = vec![SpecColumn::new("start").with_type(EnumFieldType::DateIso)];
    let rows = InMemoryRowSource::new(vec![json!({"id": 1, "start": "2005-12-20T18:19:19.992Z"})]);

    let result = GridExportPipeline::default()
        .run(&columns, &rows, &SpecExcelExportOptions::default())
        .unwrap();

    let cell = &result.model.rows[1][0];
    assert_eq!(cell.value(), &EnumCellValue::from("2005-12-20"));
    let n_style_id = cell.style_id().unwrap();
    let style = result.styles.iter().find(|style| style.id == n_style_id).unwrap();
    assert_eq!(style.format.num_format.as_deref(), Some("YYYY-MM-DD"));
}

#[test]
fn scenario_group_title_indentation() {
    let columns = vec![SpecColumn::new("order")];
    let rows = InMemoryRowSource::new(vec![
        json!({"title": "Order: 20 (2 items)", "collapsed": false, "level": 0}),
        json!({"id": 1, "order": 20}),
        json!({"id": 2, "order": 20}),
    ])
    .with_groupings(vec![SpecGrouping {
        getter: "order".to_string(),
        collapsed: false,
    }]);
    let options = SpecExcelExportOptions {
        add_group_indentation: true,
        ..Default::default()
    };

    let result = GridExportPipeline::default()
        .run(&columns, &rows, &options)
        .unwrap();

    assert_eq!(
        result.model.rows[1],
        vec![EnumExportCell::text("⮟ Order: 20 (2 items)")]
    );
    assert_eq!(result.model.rows[0][0].value(), &EnumCellValue::from("Group By"));
    assert_eq!(result.model.rows[2][0], EnumExportCell::blank());
}

#[test]
fn scenario_colspan_merges_two_columns() {
    let columns = vec![
        SpecColumn::new("firstName"),
        SpecColumn::new("lastName"),
        SpecColumn::new("age"),
        SpecColumn::new("city"),
    ];
    let rows = InMemoryRowSource::new(vec![
        json!({"id": 1, "firstName": "Ann", "lastName": "Lee", "age": 30, "city": "Oslo"}),
        json!({"id": 2, "firstName": "Bob", "lastName": "Ray", "age": 40, "city": "Rome"}),
    ])
    .with_item_metadata(1, json!({"columns": {"lastName": {"colspan": 2}}}))
    .unwrap();

    let result = GridExportPipeline::default()
        .run(&columns, &rows, &SpecExcelExportOptions::default())
        .unwrap();

    let row = &result.model.rows[2];
    assert_eq!(row.len(), 4);
    assert_eq!(row[1].value(), &EnumCellValue::from("Ray"));
    assert_eq!(row[2], EnumExportCell::blank());
    assert_eq!(row[3].value(), &EnumCellValue::from("Rome"));
    assert_eq!(
        result.merges,
        vec![SpecMergeRange {
            row_idx: 2,
            col_idx_start: 1,
            col_idx_end: 2,
        }]
    );
    assert_eq!(serde_json::to_value(&result.merges).unwrap(), json!([["B3", "C3"]]));
}

#[test]
fn scenario_sanitize_before_styling() {
    let mut amount = SpecColumn::new("amount").with_type(EnumFieldType::Number);
    amount.sanitize_data_export = true;
    let columns = vec![amount, SpecColumn::new("label")];
    let rows = InMemoryRowSource::new(vec![json!({
        "id": 1,
        "amount": "<b>10</b>",
        "label": "<b>10</b>"
    })]);
    let options = SpecExcelExportOptions {
        sanitize_data_export: false,
        ..Default::default()
    };

    let result = GridExportPipeline::default()
        .run(&columns, &rows, &options)
        .unwrap();

    let row = &result.model.rows[1];
    assert_eq!(row[0].value(), &EnumCellValue::Number(10.0));
    assert_eq!(row[1], EnumExportCell::text("<b>10</b>"));

    let options = SpecExcelExportOptions {
        sanitize_data_export: true,
        ..Default::default()
    };
    let result = GridExportPipeline::default()
        .run(&columns, &rows, &options)
        .unwrap();
    assert_eq!(result.model.rows[1][1], EnumExportCell::text("10"));
}

#[test]
fn hidden_and_excluded_columns_emit_nothing() {
    let columns = derive_columns(json!([
        {"id": "a", "name": "A"},
        {"id": "b", "name": "B", "width": 0},
        {"id": "c", "name": "C", "excludeFromExport": true},
        {"id": "d", "name": "D", "width": 50}
    ]));
    let rows = InMemoryRowSource::new(vec![json!({"id": 1, "a": 1, "b": 2, "c": 3, "d": 4})]);

    let result = GridExportPipeline::default()
        .run(&columns, &rows, &SpecExcelExportOptions::default())
        .unwrap();

    let l_header: Vec<String> = result.model.rows[0]
        .iter()
        .map(|cell| cell.value().to_text())
        .collect();
    assert_eq!(l_header, vec!["A", "D"]);
    assert_eq!(result.model.rows[1].len(), 2);
    assert_eq!(result.model.rows[1][1].value(), &EnumCellValue::Number(4.0));
}

#[test]
fn pre_header_merges_partition_group_runs() {
    let columns = derive_columns(json!([
        {"id": "a", "columnGroup": "Common"},
        {"id": "b", "columnGroup": "Common"},
        {"id": "c"},
        {"id": "d", "columnGroup": "Period"},
        {"id": "e", "columnGroup": "Period"},
        {"id": "f", "columnGroup": "Analysis"}
    ]));
    let rows = InMemoryRowSource::new(vec![json!({"id": 1})]);
    let pipeline = GridExportPipeline::new(SpecGridOptions {
        create_pre_header_panel: true,
        show_pre_header_panel: true,
        ..Default::default()
    });

    let result = pipeline
        .run(&columns, &rows, &SpecExcelExportOptions::default())
        .unwrap();

    assert_eq!(
        serde_json::to_value(&result.merges).unwrap(),
        json!([["A1", "B1"], ["D1", "E1"], ["F1", "F1"]])
    );
    let n_pre_header_style = result.model.rows[0][0].style_id().unwrap();
    assert!(result.model.rows[0]
        .iter()
        .all(|cell| cell.style_id() == Some(n_pre_header_style)));
    assert_eq!(result.model.rows[1][0].value(), &EnumCellValue::from("A"));
}

#[test]
fn pre_header_is_skipped_with_draggable_grouping() {
    let columns = derive_columns(json!([{"id": "a", "columnGroup": "G"}]));
    let rows = InMemoryRowSource::new(vec![json!({"id": 1, "a": "x"})]);
    let pipeline = GridExportPipeline::new(SpecGridOptions {
        create_pre_header_panel: true,
        show_pre_header_panel: true,
        enable_draggable_grouping: true,
        ..Default::default()
    });

    let result = pipeline
        .run(&columns, &rows, &SpecExcelExportOptions::default())
        .unwrap();
    assert_eq!(result.model.rows.len(), 2);
    assert!(result.merges.is_empty());
}

#[test]
fn styles_are_registered_once_per_run() {
    let columns = vec![
        SpecColumn::new("a").with_type(EnumFieldType::Number),
        SpecColumn::new("b").with_type(EnumFieldType::Float),
        SpecColumn::new("c").with_type(EnumFieldType::Date),
        SpecColumn::new("d").with_type(EnumFieldType::DateIso),
    ];
    let rows = InMemoryRowSource::new(
        (0..20)
            .map(|i| json!({"id": i, "a": i, "b": "1.5", "c": "2020-01-02", "d": "2020-01-03"}))
            .collect(),
    );

    let result = GridExportPipeline::default()
        .run(&columns, &rows, &SpecExcelExportOptions::default())
        .unwrap();

    // header, number, date
    assert_eq!(result.styles.len(), 3);
    let l_ids: Vec<u32> = result.styles.iter().map(|style| style.id).collect();
    assert_eq!(l_ids, vec![1, 2, 3]);
    assert!(result.model.rows[1..].iter().all(|row| {
        row[0].style_id() == row[1].style_id() && row[2].style_id() == row[3].style_id()
    }));
}

#[test]
fn translated_headers_and_group_by_label() {
    let columns = derive_columns(json!([
        {"id": "name", "nameKey": "NAME"},
        {"id": "qty", "name": "Quantity"}
    ]));
    let rows = InMemoryRowSource::new(vec![
        json!({"title": "G", "level": 0, "collapsed": true}),
        json!({"id": 1, "name": "x", "qty": 1}),
    ])
    .with_groupings(vec![SpecGrouping::default()]);
    let pipeline = GridExportPipeline::new(SpecGridOptions {
        enable_translate: true,
        ..Default::default()
    })
    .with_translator(|key: &str| format!("[{key}]"));

    let result = pipeline
        .run(&columns, &rows, &SpecExcelExportOptions::default())
        .unwrap();

    let l_header: Vec<String> = result.model.rows[0]
        .iter()
        .map(|cell| cell.value().to_text())
        .collect();
    assert_eq!(l_header, vec!["[GROUP_BY]", "[NAME]", "Quantity"]);
    assert_eq!(result.model.rows[1], vec![EnumExportCell::text("G")]);
}

#[test]
fn model_round_trips_into_workbook_bytes() {
    let columns = derive_columns(json!([
        {"id": "name", "name": "Name"},
        {"id": "cost", "name": "Cost", "type": "number", "exportColumnWidth": 14}
    ]));
    let rows = InMemoryRowSource::new(vec![
        json!({"id": 1, "name": "a", "cost": 3}),
        json!({"id": 2, "name": "b", "cost": "n/a"}),
    ])
    .with_item_metadata(1, json!({"columns": {"0": {"colspan": "*"}}}))
    .unwrap();

    let result = GridExportPipeline::default()
        .run(&columns, &rows, &SpecExcelExportOptions::default())
        .unwrap();
    assert_eq!(result.model.column_widths, vec![None, Some(14.0)]);
    assert_eq!(result.merges.len(), 1);

    let bytes = XlsxModelWriter::new("Sheet1").write_to_buffer(&result).unwrap();
    assert!(bytes.starts_with(b"PK"));
}

#[test]
fn body_colspan_lands_below_pre_header_with_group_by_offset() {
    let columns = derive_columns(json!([
        {"id": "a", "columnGroup": "G"},
        {"id": "b", "columnGroup": "G"},
        {"id": "c"}
    ]));
    let rows = InMemoryRowSource::new(vec![
        json!({"title": "Total: 2", "level": 0, "collapsed": false}),
        json!({"id": 1, "a": "x", "b": "y", "c": "z"}),
        json!({"id": 2, "a": "u", "b": "v", "c": "w"}),
    ])
    .with_groupings(vec![SpecGrouping::default()])
    .with_item_metadata(2, json!({"columns": {"b": {"colspan": "*"}}}))
    .unwrap();
    let pipeline = GridExportPipeline::new(SpecGridOptions {
        create_pre_header_panel: true,
        show_pre_header_panel: true,
        ..Default::default()
    });

    let result = pipeline
        .run(&columns, &rows, &SpecExcelExportOptions::default())
        .unwrap();

    // pre-header, header, group title, two items
    assert_eq!(result.model.rows.len(), 5);
    assert_eq!(
        serde_json::to_value(&result.merges).unwrap(),
        json!([["B1", "C1"], ["C5", "D5"]])
    );
    let row = &result.model.rows[4];
    assert_eq!(row[0], EnumExportCell::blank());
    assert_eq!(row[2].value(), &EnumCellValue::from("v"));
    assert_eq!(row[3], EnumExportCell::blank());
}

#[test]
fn pre_header_labels_are_translated() {
    let columns = derive_columns(json!([
        {"id": "a", "columnGroupKey": "PERIOD", "columnGroup": "Period"},
        {"id": "b", "columnGroupKey": "PERIOD"},
        {"id": "c", "columnGroup": "Analysis"}
    ]));
    let rows = InMemoryRowSource::new(vec![json!({"id": 1})]);
    let pipeline = GridExportPipeline::new(SpecGridOptions {
        enable_translate: true,
        create_pre_header_panel: true,
        show_pre_header_panel: true,
        ..Default::default()
    })
    .with_translator(|key: &str| format!("[{key}]"));

    let result = pipeline
        .run(&columns, &rows, &SpecExcelExportOptions::default())
        .unwrap();

    let l_pre_header: Vec<String> = result.model.rows[0]
        .iter()
        .map(|cell| cell.value().to_text())
        .collect();
    assert_eq!(l_pre_header, vec!["[PERIOD]", "[PERIOD]", "Analysis"]);
    assert_eq!(
        serde_json::to_value(&result.merges).unwrap(),
        json!([["A1", "B1"], ["C1", "C1"]])
    );
}
