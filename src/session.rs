use crate::{
    discovery::FileDescriptor,
    engine::{DocHandle, Engine, InteractionLevel},
    error::{BatchError, ProcessError},
};
use tracing::{debug, warn};

/// Owns one open document and closes it, discarding unsaved state, on drop.
///
/// Closing in `Drop` covers every exit path of the body, unwinding included.
pub struct DocumentSession<'e, E: Engine + ?Sized> {
    engine: &'e E,
    file: &'e FileDescriptor,
    doc: Option<DocHandle>,
}

impl<'e, E: Engine + ?Sized> DocumentSession<'e, E> {
    pub fn open(engine: &'e E, file: &'e FileDescriptor) -> Result<Self, ProcessError> {
        let doc = engine.open(&file.path).map_err(ProcessError::open)?;
        debug!("opened {} as doc {}", file.path.display(), doc.id());
        Ok(Self {
            engine,
            file,
            doc: Some(doc),
        })
    }

    pub fn handle(&self) -> &DocHandle {
        match &self.doc {
            Some(doc) => doc,
            None => unreachable!("document handle is only taken in drop"),
        }
    }
}

impl<E: Engine + ?Sized> Drop for DocumentSession<'_, E> {
    fn drop(&mut self) {
        if let Some(doc) = self.doc.take() {
            let id = doc.id();
            if let Err(err) = self.engine.close(doc, true) {
                warn!("closing {} (doc {id}) failed: {err:#}", self.file.path.display());
            }
        }
    }
}

/// Opens `file`, runs `body` with the handle exactly once, then closes the document.
///
/// Returns an `OpenFailed` error without calling `body` when the open fails.
/// A close failure is logged and never replaces the body's result.
pub fn with_document<E, R, F>(
    engine: &E,
    file: &FileDescriptor,
    body: F,
) -> Result<R, ProcessError>
where
    E: Engine + ?Sized,
    F: FnOnce(&DocHandle) -> Result<R, ProcessError>,
{
    let session = DocumentSession::open(engine, file)?;
    body(session.handle())
}

/// Sets the engine's interaction level for the lifetime of the scope and
/// restores the previous level on drop.
pub struct InteractionScope<'e, E: Engine + ?Sized> {
    engine: &'e E,
    previous: Option<InteractionLevel>,
}

impl<'e, E: Engine + ?Sized> InteractionScope<'e, E> {
    pub fn enter(engine: &'e E, level: InteractionLevel) -> Result<Self, BatchError> {
        let previous = engine.interaction_level().map_err(BatchError::Engine)?;
        if previous != level {
            engine
                .set_interaction_level(level)
                .map_err(BatchError::Engine)?;
        }
        Ok(Self {
            engine,
            previous: (previous != level).then_some(previous),
        })
    }

    /// Enters a dialog-suppressing scope, or a no-op scope when `suppress` is false.
    pub fn suppress_dialogs(engine: &'e E, suppress: bool) -> Result<Self, BatchError> {
        if suppress {
            Self::enter(engine, InteractionLevel::DontDisplayAlerts)
        } else {
            Ok(Self {
                engine,
                previous: None,
            })
        }
    }
}

impl<E: Engine + ?Sized> Drop for InteractionScope<'_, E> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            if let Err(err) = self.engine.set_interaction_level(previous) {
                warn!("restoring interaction level {previous:?} failed: {err:#}");
            }
        }
    }
}
