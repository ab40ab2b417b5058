use noiseconfig::{NoiseField, NoiseSettings};

/// Receives noise settings destined for the GPU.
pub trait NoiseUniformSink {
    fn apply_noise(&mut self, settings: &NoiseSettings);
}

pub type SettingsListener = Box<dyn FnMut(&NoiseSettings)>;

/// Owns the current noise settings and fans updates out to the active noise
/// pass and to subscribers.
///
/// Every mutation replaces all four fields at once, so the sink never sees a
/// mix of old and new values.
pub struct NoiseControls {
    settings: NoiseSettings,
    listeners: Vec<SettingsListener>,
}

impl NoiseControls {
    pub fn new(initial: NoiseSettings) -> Self {
        Self {
            settings: initial.clamped(),
            listeners: Vec::new(),
        }
    }

    pub fn settings(&self) -> NoiseSettings {
        self.settings
    }

    /// Registers a callback invoked after every replacement.
    pub fn subscribe(&mut self, listener: impl FnMut(&NoiseSettings) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Clamps `new` into bounds, then stores and publishes it.
    pub fn on_change(
        &mut self,
        new: NoiseSettings,
        sink: &mut impl NoiseUniformSink,
    ) -> NoiseSettings {
        self.replace(new.clamped(), sink)
    }

    pub fn set_field(
        &mut self,
        field: NoiseField,
        value: f32,
        sink: &mut impl NoiseUniformSink,
    ) -> NoiseSettings {
        let next = self.settings.with(field, value);
        self.replace(next, sink)
    }

    /// Restores the built-in defaults, not the values the session started with.
    pub fn reset(&mut self, sink: &mut impl NoiseUniformSink) -> NoiseSettings {
        self.replace(NoiseSettings::DEFAULT, sink)
    }

    fn replace(&mut self, next: NoiseSettings, sink: &mut impl NoiseUniformSink) -> NoiseSettings {
        self.settings = next;
        sink.apply_noise(&next);
        tracing::debug!(settings = %next, "noise settings updated");
        for listener in &mut self.listeners {
            listener(&next);
        }
        next
    }
}

impl std::fmt::Debug for NoiseControls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseControls")
            .field("settings", &self.settings)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
