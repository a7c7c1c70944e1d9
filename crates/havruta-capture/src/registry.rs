use crate::recognizer_trait::SpeechRecognizer;
use havruta_core::CaptureError;
use std::collections::HashMap;

pub struct RecognizerRegistry {
    factories: HashMap<String, fn() -> Box<dyn SpeechRecognizer>>,
}

impl RecognizerRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("scripted", || {
            Box::new(crate::scripted::ScriptedRecognizer::new())
        });
        registry.register("typed", || Box::new(crate::typed::TypedRecognizer::new()));
        registry
    }

    pub fn register(&mut self, name: &str, factory: fn() -> Box<dyn SpeechRecognizer>) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn SpeechRecognizer>, CaptureError> {
        self.factories
            .get(name)
            .map(|f| f())
            .ok_or_else(|| CaptureError::Unknown(format!("recognizer not found: {name}")))
    }

    pub fn list_recognizers(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for RecognizerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
