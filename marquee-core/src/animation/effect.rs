//! Effect catalogue
//!
//! Effects are either a single primitive or an entry/exit pair played back to
//! back. Names match what the message and settings feeds use.

/// Panel edge a scroll enters from or leaves through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    Left,
    Right,
    Top,
    Bottom,
}

impl Edge {
    pub fn is_vertical(self) -> bool {
        matches!(self, Edge::Top | Edge::Bottom)
    }
}

/// One animation primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Primitive {
    /// Slide from beyond the edge to the rest position
    ScrollIn(Edge),
    /// Slide from the rest position out beyond the edge
    ScrollOut(Edge),
    /// Equal off/on visibility cycles
    Flash,
    /// Short blanks between long visible spans
    Blink,
    /// Opacity ramp up then down
    Fade,
    /// Hold at the rest position
    Static,
}

impl Primitive {
    /// Whether this is a vertical scroll
    pub fn is_vertical(self) -> bool {
        match self {
            Primitive::ScrollIn(edge) | Primitive::ScrollOut(edge) => edge.is_vertical(),
            _ => false,
        }
    }
}

/// A named effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Effect {
    Single(Primitive),
    /// Entry then exit with no blank frame in between; vertical entries hold
    /// at rest before the exit starts
    Sequence { entry: Primitive, exit: Primitive },
}

/// Effect used for unknown names
pub const FALLBACK_EFFECT: Effect = Effect::Single(Primitive::Static);

impl Effect {
    /// Look up an effect by name
    pub fn lookup(name: &str) -> Option<Self> {
        use Edge::*;
        use Primitive::*;

        let single = |p| Some(Effect::Single(p));
        let sequence = |entry, exit| Some(Effect::Sequence { entry, exit });

        match name {
            "in_right" => single(ScrollIn(Right)),
            "in_left" => single(ScrollIn(Left)),
            "in_top" => single(ScrollIn(Top)),
            "in_bottom" => single(ScrollIn(Bottom)),
            "out_right" => single(ScrollOut(Right)),
            "out_left" => single(ScrollOut(Left)),
            "out_top" => single(ScrollOut(Top)),
            "out_bottom" => single(ScrollOut(Bottom)),
            "flash" => single(Flash),
            "blink" => single(Blink),
            "fade" => single(Fade),
            "none" => single(Static),
            // Both horizontal crossings read as a classic marquee
            "left2right" | "right2left" => sequence(ScrollIn(Right), ScrollOut(Left)),
            "left2left" => sequence(ScrollIn(Left), ScrollOut(Left)),
            "right2right" => sequence(ScrollIn(Right), ScrollOut(Right)),
            "top2top" => sequence(ScrollIn(Top), ScrollOut(Top)),
            "bottom2bottom" => sequence(ScrollIn(Bottom), ScrollOut(Bottom)),
            "top2bottom" => sequence(ScrollIn(Top), ScrollOut(Bottom)),
            "bottom2top" => sequence(ScrollIn(Bottom), ScrollOut(Top)),
            _ => None,
        }
    }

    /// Look up an effect, falling back to a static frame for unknown names
    pub fn resolve(name: &str) -> Self {
        match Self::lookup(name) {
            Some(effect) => effect,
            None => {
                warn!("Unknown effect '{}', showing static", name);
                FALLBACK_EFFECT
            }
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Effect::Sequence { .. })
    }
}
