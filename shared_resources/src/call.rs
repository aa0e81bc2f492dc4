#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    HallUp = 0,
    HallDown = 1,
    Cabin = 2,
}

impl Call {
    pub fn from_button_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Call::HallUp),
            1 => Some(Call::HallDown),
            2 => Some(Call::Cabin),
            _ => None,
        }
    }

    pub fn as_button_index(self) -> u8 {
        self as u8
    }

    pub fn is_hall(self) -> bool {
        !matches!(self, Call::Cabin)
    }

    pub fn iter() -> impl Iterator<Item = Call> {
        [Call::HallUp, Call::HallDown, Call::Cabin].iter().copied()
    }

    pub fn iter_hall() -> impl Iterator<Item = Call> {
        [Call::HallUp, Call::HallDown].iter().copied()
    }
}
