/// User-facing progress texts. The defaults reproduce the application's
/// original Spanish strings; a host can swap in its own set instead of the
/// core hard-coding prose. Templates use `{}` for the single dynamic slot.
#[derive(Debug, Clone)]
pub struct Messages {
    pub starting: String,
    pub downloading: String,
    pub processing: String,
    pub download_error: String,
    pub extracting_audio: String,
    pub adding_metadata: String,
    pub post_processing: String,
    pub finalizing: String,
    pub finished: String,
    pub error: String,
    pub unknown_platform: String,

    // Browser-driven (Audiomack) flow.
    pub audiomack_starting: String,
    pub loading_page: String,
    pub closing_popups: String,
    pub starting_playback: String,
    pub waiting_for_audio: String,
    pub searching_stream: String,
    pub downloading_track: String,
    pub transfer: String,
    pub converting: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            starting: "Iniciando descarga…".into(),
            downloading: "Descargando… {}%".into(),
            processing: "Procesando archivo…".into(),
            download_error: "Error en la descarga".into(),
            extracting_audio: "Extrayendo audio…".into(),
            adding_metadata: "Añadiendo metadatos…".into(),
            post_processing: "Procesando…".into(),
            finalizing: "Finalizando…".into(),
            finished: "Descarga completa: {}".into(),
            error: "Error: {}".into(),
            unknown_platform: "Desconocida".into(),

            audiomack_starting: "Iniciando descarga de Audiomack...".into(),
            loading_page: "Cargando página...".into(),
            closing_popups: "Cerrando popups...".into(),
            starting_playback: "Iniciando reproducción...".into(),
            waiting_for_audio: "Esperando carga de audio...".into(),
            searching_stream: "Buscando URL de audio...".into(),
            downloading_track: "Descargando: {}".into(),
            transfer: "Descargando... {} KB / {} KB".into(),
            converting: "Convirtiendo a MP3...".into(),
        }
    }
}

impl Messages {
    pub fn downloading(&self, percent: f64) -> String {
        fill(&self.downloading, &format!("{:.1}", percent))
    }

    pub fn finished(&self, title: &str) -> String {
        fill(&self.finished, title)
    }

    pub fn error(&self, text: &str) -> String {
        fill(&self.error, text)
    }

    pub fn downloading_track(&self, title: &str) -> String {
        fill(&self.downloading_track, title)
    }

    pub fn transfer(&self, downloaded_kb: u64, total_kb: u64) -> String {
        let once = fill(&self.transfer, &downloaded_kb.to_string());
        fill(&once, &total_kb.to_string())
    }
}

fn fill(template: &str, value: &str) -> String {
    template.replacen("{}", value, 1)
}
