use crate::render::backend::ShaderId;

/// Shader source handed to the backend compiler.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ShaderProgram {
    /// Debug name.
    pub name: String,
    /// Backend-specific program source.
    pub source: String,
}

impl ShaderProgram {
    /// Create a program description.
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }
}

/// Owning handle to a compiled shader.
///
/// Created by [`crate::Graphics::new_shader`] and released by
/// [`crate::Graphics::dispose_shader`]. Using a disposed handle panics.
#[derive(Debug)]
pub struct Shader {
    id: Option<ShaderId>,
}

impl Shader {
    pub(crate) fn new(id: ShaderId) -> Self {
        Self { id: Some(id) }
    }

    /// Compiled program id.
    ///
    /// # Panics
    ///
    /// Panics when the shader has been disposed.
    pub fn id(&self) -> ShaderId {
        match self.id {
            Some(id) => id,
            None => panic!("texstage: shader used after disposal"),
        }
    }

    /// Return `true` once the handle has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.id.is_none()
    }

    pub(crate) fn take(&mut self) -> ShaderId {
        let id = self.id();
        self.id = None;
        id
    }
}
