use crate::config::AnalysisConfig;
use crate::models::AnalysisResult;
use crate::pipeline;
use crate::types::{Dataset, EquipmentRecord};

use axum::response::Response;

/// CSV upload matching [get_test_dataset].
pub(crate) const SAMPLE_CSV: &str = "Equipment Name,Type,Flowrate,Pressure,Temperature
Pump-1,Pump,120,5.2,110
Compressor-1,Compressor,95,8.4,95
Pump-2,Pump,100,4.8,105
Valve-1,Valve,60,3.1,80
Compressor-2,Compressor,110,9.0,130
";

/// Two row CSV upload.
pub(crate) const TWO_ROW_CSV: &str = "Equipment Name,Type,Flowrate,Pressure,Temperature
Pump-1,Pump,120,5.2,110
Compressor-1,Compressor,95,8.4,95
";

/// Create a small dataset with three equipment types.
pub(crate) fn get_test_dataset() -> Dataset {
    Dataset::from_records(vec![
        EquipmentRecord::new("Pump-1", "Pump", 120.0, 5.2, 110.0),
        EquipmentRecord::new("Compressor-1", "Compressor", 95.0, 8.4, 95.0),
        EquipmentRecord::new("Pump-2", "Pump", 100.0, 4.8, 105.0),
        EquipmentRecord::new("Valve-1", "Valve", 60.0, 3.1, 80.0),
        EquipmentRecord::new("Compressor-2", "Compressor", 110.0, 9.0, 130.0),
    ])
}

/// Create a dataset with a single record.
pub(crate) fn get_single_record_dataset() -> Dataset {
    Dataset::from_records(vec![EquipmentRecord::new(
        "Reactor-1",
        "Reactor",
        50.0,
        2.0,
        300.0,
    )])
}

/// Analyse [SAMPLE_CSV] with the default configuration.
pub(crate) fn get_test_analysis() -> AnalysisResult {
    pipeline::analyze(SAMPLE_CSV.as_bytes(), &AnalysisConfig::default()).unwrap()
}

/// Boundary used by [multipart_body].
const MULTIPART_BOUNDARY: &str = "chemviz-test-boundary";

/// Content type header value matching [multipart_body].
pub(crate) fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}")
}

/// Create a multipart form body with a single file field.
pub(crate) fn multipart_body(field: &str, filename: &str, data: &str) -> String {
    format!(
        "--{MULTIPART_BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: text/csv\r\n\
         \r\n\
         {data}\r\n\
         --{MULTIPART_BOUNDARY}--\r\n"
    )
}

// Jump through the hoops to get the body as a string.
pub(crate) async fn body_string(response: Response) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

pub(crate) async fn body_bytes(response: Response) -> Vec<u8> {
    hyper::body::to_bytes(response.into_body())
        .await
        .unwrap()
        .to_vec()
}
