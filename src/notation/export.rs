//! Exporter seam
//!
//! Serializers for concrete formats (MusicXML, Standard MIDI File) live
//! outside this crate and implement [`NotationExporter`].

use serde::{Deserialize, Serialize};

use super::instruments::InstrumentProfile;
use super::model::{NoteModel, PitchView};
use crate::error::Result;

/// Which views an export should contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportViews {
    /// Include the concert-pitch view
    pub concert: bool,
    /// Include the written (transposed) view
    pub written: bool,
}

impl ExportViews {
    /// Concert view only
    pub const CONCERT: ExportViews = ExportViews {
        concert: true,
        written: false,
    };

    /// Both views
    pub const BOTH: ExportViews = ExportViews {
        concert: true,
        written: true,
    };

    /// Concert view, plus the written view when the instrument transposes
    pub fn for_instrument(profile: &InstrumentProfile) -> Self {
        Self {
            concert: true,
            written: profile.is_transposing(),
        }
    }

    /// Requested views in order (concert first)
    pub fn iter(&self) -> impl Iterator<Item = PitchView> {
        let concert = self.concert.then_some(PitchView::Concert);
        let written = self.written.then_some(PitchView::Written);
        concert.into_iter().chain(written)
    }
}

impl Default for ExportViews {
    fn default() -> Self {
        Self::CONCERT
    }
}

/// Consumer of a finished note model
pub trait NotationExporter {
    /// What the exporter produces (bytes, a file path, a document, ...)
    type Output;

    /// Export the model in the requested views
    fn export(
        &mut self,
        model: NoteModel,
        instrument: &InstrumentProfile,
        views: ExportViews,
    ) -> Result<Self::Output>;
}

impl<E: NotationExporter + ?Sized> NotationExporter for &mut E {
    type Output = E::Output;

    fn export(
        &mut self,
        model: NoteModel,
        instrument: &InstrumentProfile,
        views: ExportViews,
    ) -> Result<Self::Output> {
        (**self).export(model, instrument, views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::result::Key;
    use crate::features::rhythm::TimeSignature;
    use crate::notation::instruments::instrument;

    /// Records which views it was asked for and the key of each
    struct RecordingExporter {
        exported: Vec<(PitchView, bool, Key)>,
    }

    impl NotationExporter for RecordingExporter {
        type Output = usize;

        fn export(
            &mut self,
            model: NoteModel,
            _instrument: &InstrumentProfile,
            views: ExportViews,
        ) -> Result<usize> {
            for view in views.iter() {
                let v = model.view(view);
                self.exported.push((view, v.is_transposed_view(), v.key()));
            }
            Ok(self.exported.len())
        }
    }

    #[test]
    fn test_views_for_instrument() {
        let horn = instrument("horn_f").unwrap();
        assert_eq!(ExportViews::for_instrument(horn), ExportViews::BOTH);
        let flute = instrument("flute").unwrap();
        assert_eq!(ExportViews::for_instrument(flute), ExportViews::CONCERT);
        let views: Vec<PitchView> = ExportViews::BOTH.iter().collect();
        assert_eq!(views, vec![PitchView::Concert, PitchView::Written]);
    }

    #[test]
    fn test_exporter_receives_model_by_value() {
        let flute = instrument("flute").unwrap();
        let mut model =
            NoteModel::empty(flute.id.clone(), 100, TimeSignature::FOUR_FOUR, Key::Minor(2));
        model.written_key = Key::Minor(4);
        model.transposing = true;

        let mut exporter = RecordingExporter { exported: Vec::new() };
        let count = (&mut exporter).export(model, flute, ExportViews::BOTH).unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            exporter.exported,
            vec![
                (PitchView::Concert, false, Key::Minor(2)),
                (PitchView::Written, true, Key::Minor(4)),
            ]
        );
    }
}
