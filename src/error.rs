use thiserror::Error;

/// Failure taxonomy for a download. Every variant is reported once through
/// the progress channel and once as the call's return value.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// URL matched no registered platform. Never reaches the network.
    #[error("URL no soportada. Plataformas disponibles: {supported}")]
    UnsupportedUrl { supported: String },

    /// The extraction engine (yt-dlp) failed, retries included.
    #[error("fallo del motor de extracción: {0}")]
    Engine(String),

    /// Browser automation failed on a required step.
    #[error("fallo de automatización: {0}")]
    Browser(String),

    /// The required play control never appeared. Fatal and explicit.
    #[error("No se encontró botón de play: {0}")]
    PlayControlNotFound(String),

    /// No captured network request matched the streaming host.
    #[error("No se pudo obtener la URL de streaming.")]
    StreamingUrlNotFound,

    #[error("HTTP {status} al descargar {url}")]
    HttpStatus { status: u16, url: String },

    /// Server answered with a page instead of media; the URL likely expired.
    #[error("el servidor devolvió HTML en lugar de audio")]
    HtmlResponse,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
