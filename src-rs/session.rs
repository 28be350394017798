//! In-memory viewing session.
//!
//! A session holds at most one frame-set and one image. Incoming files are
//! validated before anything resident is touched, so a rejected load never
//! changes state. A successful load into a complete pair drops the other
//! kind, forcing the user to pair again.

use std::path::Path;

use serde::Serialize;

use crate::error::{ViewerError, ViewerResult};
use crate::loader::{self, ImageHandle, LoadedFrameSet};
use crate::normalize::{self, CanonicalFrameSet, SchemaTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Empty,
    FrameSetOnly,
    ImageOnly,
    Paired,
}

#[derive(Debug)]
pub enum SessionEvent {
    FrameSetLoaded(LoadedFrameSet),
    ImageLoaded(ImageHandle),
}

#[derive(Debug, Default)]
pub struct Session {
    frame_set: Option<LoadedFrameSet>,
    image: Option<ImageHandle>,
    last_error: Option<String>,
}

fn check_dimensions(frame_set: &CanonicalFrameSet, image: &ImageHandle) -> ViewerResult<()> {
    let (image_w, image_h) = image.dimensions();
    if frame_set.sheet_size.matches(image_w, image_h) {
        Ok(())
    } else {
        Err(ViewerError::DimensionMismatch {
            image_w,
            image_h,
            sheet: frame_set.sheet_size.to_string(),
        })
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SessionPhase {
        match (&self.frame_set, &self.image) {
            (None, None) => SessionPhase::Empty,
            (Some(_), None) => SessionPhase::FrameSetOnly,
            (None, Some(_)) => SessionPhase::ImageOnly,
            (Some(_), Some(_)) => SessionPhase::Paired,
        }
    }

    pub fn frame_set(&self) -> Option<&CanonicalFrameSet> {
        self.frame_set.as_ref().map(|loaded| &loaded.frame_set)
    }

    pub fn image(&self) -> Option<&ImageHandle> {
        self.image.as_ref()
    }

    pub fn source_format(&self) -> Option<SchemaTag> {
        self.frame_set.as_ref().map(|loaded| loaded.tag)
    }

    pub fn base_name(&self) -> Option<&str> {
        self.frame_set
            .as_ref()
            .and_then(|loaded| loaded.base_name.as_deref())
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Export is offered once a sprite-list frame-set has been paired with a
    /// sheet that passed the dimension check.
    pub fn can_export(&self) -> bool {
        self.phase() == SessionPhase::Paired && self.source_format() == Some(SchemaTag::SpriteList)
    }

    pub fn export_file_name(&self) -> String {
        normalize::export_file_name(self.base_name())
    }

    /// Apply one event. On failure the error is recorded as the latest error
    /// and held state is left exactly as it was; on success any previous
    /// error is cleared.
    pub fn apply(&mut self, event: SessionEvent) -> ViewerResult<SessionPhase> {
        let before = self.phase();
        let outcome = match event {
            SessionEvent::FrameSetLoaded(loaded) => self.accept_frame_set(loaded),
            SessionEvent::ImageLoaded(image) => self.accept_image(image),
        };
        match outcome {
            Ok(()) => {
                self.last_error = None;
                let after = self.phase();
                tracing::debug!(?before, ?after, "session transition");
                Ok(after)
            }
            Err(err) => Err(self.record_failure(err)),
        }
    }

    /// Record an error raised before an event could be formed (wrong file
    /// kind, parse or decode failure) and hand it back.
    pub fn record_failure(&mut self, err: ViewerError) -> ViewerError {
        tracing::warn!(kind = err.kind(), "load rejected: {err}");
        self.last_error = Some(err.to_string());
        err
    }

    fn accept_frame_set(&mut self, loaded: LoadedFrameSet) -> ViewerResult<()> {
        let paired = self.phase() == SessionPhase::Paired;
        if !paired {
            if let Some(image) = &self.image {
                check_dimensions(&loaded.frame_set, image)?;
            }
        }
        if paired {
            self.image = None;
        }
        self.frame_set = Some(loaded);
        Ok(())
    }

    fn accept_image(&mut self, image: ImageHandle) -> ViewerResult<()> {
        // Always checked against whatever frame-set is resident right now,
        // including the one a complete pair is about to give up.
        if let Some(loaded) = &self.frame_set {
            check_dimensions(&loaded.frame_set, &image)?;
        }
        if self.phase() == SessionPhase::Paired {
            self.frame_set = None;
        }
        self.image = Some(image);
        Ok(())
    }

    pub fn load_frame_set_file(&mut self, path: &Path) -> ViewerResult<SessionPhase> {
        match loader::load_frame_set(path) {
            Ok(loaded) => self.apply(SessionEvent::FrameSetLoaded(loaded)),
            Err(err) => Err(self.record_failure(err)),
        }
    }

    pub fn load_image_file(&mut self, path: &Path) -> ViewerResult<SessionPhase> {
        match loader::load_image(path) {
            Ok(image) => self.apply(SessionEvent::ImageLoaded(image)),
            Err(err) => Err(self.record_failure(err)),
        }
    }

    /// End the session, releasing everything it holds.
    pub fn clear(&mut self) {
        self.frame_set = None;
        self.image = None;
        self.last_error = None;
    }
}
