//! Presentation sink: the output surface the core writes into.
//!
//! The core never reads back from the sink. Any front end (terminal, web,
//! GUI) implements [`PresentationSink`] and decides how to draw.

use bioguard_types::StyleBucket;

/// Status line shown while scanning.
pub const STATUS_SEARCHING: &str = "Procurando dispositivos...";
/// Status line shown after a successful connect.
pub const STATUS_CONNECTED: &str = "Conectado com sucesso!";
/// Status line shown after the session is lost.
pub const STATUS_DISCONNECTED: &str = "Desconectado - Clique para conectar";
/// Alert raised when the platform has no Bluetooth.
pub const ALERT_UNSUPPORTED: &str = "Bluetooth não é suportado neste sistema.";

/// Label of the trigger control in its initial state.
pub const LABEL_CONNECT: &str = "Conectar ao Bio-Guard via Bluetooth";
/// Label of the trigger control while connecting.
pub const LABEL_CONNECTING: &str = "Conectando...";
/// Label of the trigger control while connected.
pub const LABEL_DISCONNECT: &str = "Desconectar";

/// Status line while connecting to a named device.
pub fn status_connecting(name: &str) -> String {
    format!("Conectando ao {}...", name)
}

/// Status line after a failed connect.
pub fn status_failed(reason: &str) -> String {
    format!("Erro na conexão: {}", reason)
}

/// Style of the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// A session is up.
    Connected,
    /// No session (idle, connecting, or failed).
    Disconnected,
}

impl StatusKind {
    /// Style class name.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::Connected => "connected",
            StatusKind::Disconnected => "disconnected",
        }
    }
}

/// What the trigger control does when activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerAction {
    /// Start a connect.
    Connect,
    /// Request a disconnect.
    Disconnect,
}

/// State of the single connect/disconnect control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerControl {
    /// Visible label.
    pub label: &'static str,
    /// Whether the control accepts input.
    pub enabled: bool,
    /// Action bound to the control.
    pub action: TriggerAction,
}

impl TriggerControl {
    /// Initial affordance: enabled, connects.
    pub fn connect() -> Self {
        Self {
            label: LABEL_CONNECT,
            enabled: true,
            action: TriggerAction::Connect,
        }
    }

    /// Disabled while a connect is in flight.
    pub fn connecting() -> Self {
        Self {
            label: LABEL_CONNECTING,
            enabled: false,
            action: TriggerAction::Connect,
        }
    }

    /// Enabled, disconnects.
    pub fn disconnect() -> Self {
        Self {
            label: LABEL_DISCONNECT,
            enabled: true,
            action: TriggerAction::Disconnect,
        }
    }
}

/// Output targets the session manager and decoder write into.
pub trait PresentationSink: Send {
    /// Replace the status line.
    fn set_status(&mut self, message: &str, kind: StatusKind);

    /// Replace the two-line summary block.
    fn set_summary(&mut self, color: &str, contamination: &str);

    /// Replace the light-intensity readout.
    fn set_light_text(&mut self, text: &str);

    /// Update the fill gauge.
    ///
    /// Implementations clear every bucket style first, then apply `bucket`
    /// if present. A `None` percent leaves the height as it was.
    fn set_fill(&mut self, percent: Option<u8>, bucket: Option<StyleBucket>);

    /// Update the connect/disconnect control.
    fn set_trigger(&mut self, control: TriggerControl);

    /// Show a blocking message. Only used when Bluetooth is unavailable.
    fn alert(&mut self, message: &str);
}

impl<S: PresentationSink + ?Sized> PresentationSink for Box<S> {
    fn set_status(&mut self, message: &str, kind: StatusKind) {
        (**self).set_status(message, kind);
    }

    fn set_summary(&mut self, color: &str, contamination: &str) {
        (**self).set_summary(color, contamination);
    }

    fn set_light_text(&mut self, text: &str) {
        (**self).set_light_text(text);
    }

    fn set_fill(&mut self, percent: Option<u8>, bucket: Option<StyleBucket>) {
        (**self).set_fill(percent, bucket);
    }

    fn set_trigger(&mut self, control: TriggerControl) {
        (**self).set_trigger(control);
    }

    fn alert(&mut self, message: &str) {
        (**self).alert(message);
    }
}
