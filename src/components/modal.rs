//! Collapsible modal sections with a slide animation.

use std::time::{Duration, Instant};

/// Every section slides open or shut over the same duration.
pub const SLIDE_DURATION: Duration = Duration::from_millis(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    IcsInstructions,
    GcalInstructions,
    Working,
    Error,
    /// The "done" footer.
    Footer,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::IcsInstructions,
        Section::GcalInstructions,
        Section::Working,
        Section::Error,
        Section::Footer,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Slide {
    open: bool,
    started: Option<Instant>,
}

impl Slide {
    const HIDDEN: Slide = Slide {
        open: false,
        started: None,
    };

    fn slide_down(&mut self, now: Instant) {
        if !self.open {
            *self = Slide::toward(true, self.extent(now), now);
        }
    }

    fn slide_up(&mut self, now: Instant) {
        if self.open {
            *self = Slide::toward(false, 1.0 - self.extent(now), now);
        }
    }

    /// A slide heading for `open` that has already covered `done` of its
    /// travel, so reversing mid-way keeps the current extent.
    fn toward(open: bool, done: f32, now: Instant) -> Slide {
        let started = now.checked_sub(SLIDE_DURATION.mul_f32(done.clamp(0.0, 1.0)));
        Slide {
            open,
            started: started.or(Some(now)),
        }
    }

    fn progress(&self, now: Instant) -> f32 {
        match self.started {
            None => 1.0,
            Some(t) => {
                let elapsed = now.saturating_duration_since(t).as_secs_f32();
                (elapsed / SLIDE_DURATION.as_secs_f32()).min(1.0)
            }
        }
    }

    fn extent(&self, now: Instant) -> f32 {
        if self.open {
            self.progress(now)
        } else {
            1.0 - self.progress(now)
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModalBodies {
    slides: [Slide; Section::ALL.len()],
}

impl Default for ModalBodies {
    fn default() -> Self {
        Self {
            slides: [Slide::HIDDEN; Section::ALL.len()],
        }
    }
}

impl ModalBodies {
    /// Collapse every section except `target`, and expand `target` unless it
    /// is already open. Repeating the call with the same target changes nothing.
    pub fn display(&mut self, target: Section, now: Instant) {
        for section in Section::ALL {
            let slide = &mut self.slides[section.index()];
            if section == target {
                slide.slide_down(now);
            } else {
                slide.slide_up(now);
            }
        }
    }

    /// The "done" state: every body collapses and only the footer shows.
    pub fn show_footer(&mut self, now: Instant) {
        self.display(Section::Footer, now);
    }

    pub fn is_open(&self, section: Section) -> bool {
        self.slides[section.index()].open
    }

    /// The section that is open or opening, if any.
    #[cfg(test)]
    pub fn current(&self) -> Option<Section> {
        Section::ALL.into_iter().find(|s| self.is_open(*s))
    }

    /// Fraction of the section's full height currently shown, 0.0 to 1.0.
    pub fn extent(&self, section: Section, now: Instant) -> f32 {
        self.slides[section.index()].extent(now)
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        self.slides.iter().any(|s| s.progress(now) < 1.0)
    }
}

/// True when `value` is non-empty and only ASCII letters, digits and whitespace.
pub fn validate_input(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
}
