/// Terrain blocks and level glyphs.
/// Block properties are queried via methods, not stored as flags,
/// so terrain semantics are centralized here.

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum Block {
    #[default]
    Empty,  // Off-level void
    Floor,
    Wall,
    Lava,   // Kills Water
    River,  // Kills Fire
    Acid,   // Kills both
}

impl Block {
    /// Classify a terrain character. Anything unrecognized is Floor.
    pub fn from_char(ch: char) -> Block {
        match ch {
            ' ' => Block::Empty,
            '.' => Block::Floor,
            '#' => Block::Wall,
            'L' => Block::Lava,
            'R' => Block::River,
            'A' => Block::Acid,
            _ => Block::Floor,
        }
    }

    /// Can a player never enter this cell?
    /// Empty is the void around the level, so it blocks like a wall.
    pub fn is_solid(self) -> bool {
        matches!(self, Block::Wall | Block::Empty)
    }
}

/// Element affinity of a player, and of the stones/exits bound to it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Affinity {
    Fire,
    Water,
}

impl Affinity {
    /// Fixed processing order: Fire first, then Water.
    pub const ALL: [Affinity; 2] = [Affinity::Fire, Affinity::Water];

    pub fn index(self) -> usize {
        match self {
            Affinity::Fire => 0,
            Affinity::Water => 1,
        }
    }

    /// Terrain that kills a player of this affinity.
    pub fn hazards(self) -> &'static [Block] {
        match self {
            Affinity::Fire => &[Block::River, Block::Acid],
            Affinity::Water => &[Block::Lava, Block::Acid],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Affinity::Fire => "Fire",
            Affinity::Water => "Water",
        }
    }
}

/// Pairing discriminant for buttons/doors and switches/portals.
/// Lowercase glyph = One, uppercase glyph = Two.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Kind {
    One,
    Two,
}

impl Kind {
    pub const ALL: [Kind; 2] = [Kind::One, Kind::Two];

    fn of(ch: char) -> Kind {
        if ch.is_ascii_uppercase() { Kind::Two } else { Kind::One }
    }
}

/// A non-terrain level symbol: player start or interactive element.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Glyph {
    Player(Affinity),       // f / w
    Stone(Affinity),        // < (ruby) / > (aquamarine)
    Exit(Affinity),         // F / W
    DoorButton(Kind),       // b / B
    Door(Kind),             // d / D
    InputPortal(Kind),      // i / I
    OutputPortal(Kind),     // o / O
    PortalSwitch(Kind),     // y / Y
}

impl Glyph {
    pub fn from_char(ch: char) -> Option<Glyph> {
        let glyph = match ch {
            'f' => Glyph::Player(Affinity::Fire),
            'w' => Glyph::Player(Affinity::Water),
            '<' => Glyph::Stone(Affinity::Fire),
            '>' => Glyph::Stone(Affinity::Water),
            'F' => Glyph::Exit(Affinity::Fire),
            'W' => Glyph::Exit(Affinity::Water),
            'b' | 'B' => Glyph::DoorButton(Kind::of(ch)),
            'd' | 'D' => Glyph::Door(Kind::of(ch)),
            'i' | 'I' => Glyph::InputPortal(Kind::of(ch)),
            'o' | 'O' => Glyph::OutputPortal(Kind::of(ch)),
            'y' | 'Y' => Glyph::PortalSwitch(Kind::of(ch)),
            _ => return None,
        };
        Some(glyph)
    }

    /// At most one instance per level is meaningful.
    pub fn is_singleton(self) -> bool {
        matches!(
            self,
            Glyph::Player(_) | Glyph::Exit(_) | Glyph::InputPortal(_) | Glyph::OutputPortal(_)
        )
    }
}
