use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrafikverketError {
    #[error("http request error: {0}")]
    Http(String),
    #[error("document error: {0}")]
    Document(String),
    #[error("image error: {0}")]
    Image(String),
    #[error("file error: {0}")]
    File(String),
}
impl From<ureq::Error> for TrafikverketError {
    fn from(e: ureq::Error) -> Self { TrafikverketError::Http(e.to_string()) }
}
impl From<serde_json::Error> for TrafikverketError {
    fn from(e: serde_json::Error) -> Self { TrafikverketError::Document(e.to_string()) }
}
impl From<image::ImageError> for TrafikverketError {
    fn from(e: image::ImageError) -> Self { TrafikverketError::Image(e.to_string()) }
}
impl From<std::io::Error> for TrafikverketError {
    fn from(e: std::io::Error) -> Self { TrafikverketError::File(e.to_string()) }
}
