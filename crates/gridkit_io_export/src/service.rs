//! Export services: run an export end to end and announce it.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::info;

use crate::column::SpecColumn;
use crate::conf::{
    C_EVENT_AFTER_EXPORT_EXCEL, C_EVENT_AFTER_EXPORT_TEXT, C_EVENT_BEFORE_EXPORT_EXCEL,
    C_EVENT_BEFORE_EXPORT_TEXT,
};
use crate::error::{ExportError, Result};
use crate::pipeline::GridExportPipeline;
use crate::source::RowSource;
use crate::spec::{EnumFileType, SpecExcelExportOptions, SpecExportFile, SpecTextExportOptions};
use crate::text::DelimitedTextRenderer;
use crate::writer::XlsxModelWriter;

/// Fire-and-forget notification sink.
pub trait ExportEventPublisher {
    /// Publish `event_name` with its payload.
    fn publish(&self, event_name: &str, payload: &Value);
}

impl<F> ExportEventPublisher for F
where
    F: Fn(&str, &Value),
{
    fn publish(&self, event_name: &str, payload: &Value) {
        self(event_name, payload)
    }
}

fn derive_after_payload(file: &SpecExportFile) -> Value {
    json!({"filename": file.filename, "mimeType": file.mime_type})
}

fn require_publisher(
    publisher: &Option<Arc<dyn ExportEventPublisher>>,
) -> Result<&dyn ExportEventPublisher> {
    publisher.as_deref().ok_or_else(|| {
        ExportError::Configuration("export service used before init()".to_string())
    })
}

////////////////////////////////////////////////////////////////////////////////
// #region ExcelExportService

/// Exports grid rows to an xlsx (or legacy xls) workbook.
#[derive(Clone)]
pub struct ExcelExportService {
    pipeline: GridExportPipeline,
    publisher: Option<Arc<dyn ExportEventPublisher>>,
}

impl ExcelExportService {
    /// Service over `pipeline`; call [`Self::init`] before exporting.
    pub fn new(pipeline: GridExportPipeline) -> Self {
        Self {
            pipeline,
            publisher: None,
        }
    }

    /// Bind the event publisher.
    pub fn init(&mut self, publisher: impl ExportEventPublisher + 'static) {
        self.publisher = Some(Arc::new(publisher));
    }

    /// Export `rows` and return the workbook file.
    pub fn export_to_excel(
        &self,
        columns: &[SpecColumn],
        rows: &dyn RowSource,
        options: &SpecExcelExportOptions,
    ) -> Result<SpecExportFile> {
        let publisher = require_publisher(&self.publisher)?;
        if !matches!(options.format, EnumFileType::Xlsx | EnumFileType::Xls) {
            return Err(ExportError::Configuration(format!(
                "excel export supports xlsx and xls, got: {}",
                options.format.extension()
            )));
        }
        self.pipeline.active_translator()?;

        publisher.publish(C_EVENT_BEFORE_EXPORT_EXCEL, &Value::Bool(true));

        let result = self.pipeline.run(columns, rows, options)?;
        let bytes = XlsxModelWriter::new(&options.sheet_name).write_to_buffer(&result)?;
        let file = SpecExportFile {
            filename: format!("{}.{}", options.filename, options.format.extension()),
            mime_type: options.format.mime_type().to_string(),
            bytes,
        };

        info!(
            filename = %file.filename,
            n_bytes = file.bytes.len(),
            report = %result.report,
            "excel export written"
        );
        publisher.publish(C_EVENT_AFTER_EXPORT_EXCEL, &derive_after_payload(&file));
        Ok(file)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TextExportService

/// Exports grid rows to a csv or txt file.
#[derive(Clone)]
pub struct TextExportService {
    pipeline: GridExportPipeline,
    publisher: Option<Arc<dyn ExportEventPublisher>>,
}

impl TextExportService {
    /// Service over `pipeline`; call [`Self::init`] before exporting.
    pub fn new(pipeline: GridExportPipeline) -> Self {
        Self {
            pipeline,
            publisher: None,
        }
    }

    /// Bind the event publisher.
    pub fn init(&mut self, publisher: impl ExportEventPublisher + 'static) {
        self.publisher = Some(Arc::new(publisher));
    }

    /// Export `rows` and return the text file.
    pub fn export_to_file(
        &self,
        columns: &[SpecColumn],
        rows: &dyn RowSource,
        options: &SpecTextExportOptions,
    ) -> Result<SpecExportFile> {
        let publisher = require_publisher(&self.publisher)?;
        let renderer = DelimitedTextRenderer::new(&self.pipeline, options)?;
        self.pipeline.active_translator()?;

        publisher.publish(C_EVENT_BEFORE_EXPORT_TEXT, &Value::Bool(true));

        let result = renderer.render(columns, rows)?;
        let file = SpecExportFile {
            filename: format!("{}.{}", options.filename, options.format.extension()),
            mime_type: options.format.mime_type().to_string(),
            bytes: result.content.into_bytes(),
        };

        info!(
            filename = %file.filename,
            n_bytes = file.bytes.len(),
            report = %result.report,
            "text export written"
        );
        publisher.publish(C_EVENT_AFTER_EXPORT_TEXT, &derive_after_payload(&file));
        Ok(file)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::source::InMemoryRowSource;
    use crate::spec::SpecGridOptions;

    fn derive_recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str, &Value) + 'static) {
        let l_events = Arc::new(Mutex::new(Vec::new()));
        let l_events_sink = Arc::clone(&l_events);
        let publisher = move |event_name: &str, payload: &Value| {
            l_events_sink
                .lock()
                .unwrap()
                .push(format!("{event_name}:{}", payload["filename"].as_str().unwrap_or("-")));
        };
        (l_events, publisher)
    }

    #[test]
    fn test_excel_export_requires_init() {
        let service = ExcelExportService::new(GridExportPipeline::default());
        let rows = InMemoryRowSource::default();
        let err = service
            .export_to_excel(&[], &rows, &SpecExcelExportOptions::default())
            .unwrap_err();
        assert!(matches!(err, ExportError::Configuration(_)));
    }

    #[test]
    fn test_excel_export_publishes_before_and_after() {
        let (l_events, publisher) = derive_recorder();
        let mut service = ExcelExportService::new(GridExportPipeline::default());
        service.init(publisher);

        let rows = InMemoryRowSource::new(vec![serde_json::json!({"id": 1, "name": "a"})]);
        let options = SpecExcelExportOptions {
            filename: "orders".to_string(),
            format: EnumFileType::Xls,
            ..Default::default()
        };
        let file = service
            .export_to_excel(&[SpecColumn::new("name")], &rows, &options)
            .unwrap();

        assert_eq!(file.filename, "orders.xls");
        assert_eq!(file.mime_type, "application/vnd.ms-excel");
        assert!(file.bytes.starts_with(b"PK"));
        assert_eq!(
            *l_events.lock().unwrap(),
            vec![
                "onBeforeExportToExcel:-".to_string(),
                "onAfterExportToExcel:orders.xls".to_string(),
            ]
        );
    }

    #[test]
    fn test_excel_export_checks_translator_before_publishing() {
        let (l_events, publisher) = derive_recorder();
        let pipeline = GridExportPipeline::new(SpecGridOptions {
            enable_translate: true,
            ..Default::default()
        });
        let mut service = ExcelExportService::new(pipeline);
        service.init(publisher);

        let rows = InMemoryRowSource::default();
        let err = service
            .export_to_excel(&[], &rows, &SpecExcelExportOptions::default())
            .unwrap_err();
        assert!(matches!(err, ExportError::Configuration(_)));
        assert!(l_events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_text_export_file() {
        let (l_events, publisher) = derive_recorder();
        let mut service = TextExportService::new(GridExportPipeline::default());
        service.init(publisher);

        let rows = InMemoryRowSource::new(vec![serde_json::json!({"id": 1, "name": "a"})]);
        let options = SpecTextExportOptions {
            use_utf8_with_bom: false,
            ..Default::default()
        };
        let file = service
            .export_to_file(&[SpecColumn::new("name")], &rows, &options)
            .unwrap();

        assert_eq!(file.filename, "export.csv");
        assert_eq!(file.mime_type, "text/csv");
        assert_eq!(String::from_utf8(file.bytes).unwrap(), "\"Name\"\n\"a\"");
        assert_eq!(l_events.lock().unwrap().len(), 2);
    }
}
