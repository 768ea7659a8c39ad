//! Engine phase ids (`G.STATES`).

pub const SELECTING_HAND: u32 = 1;
pub const HAND_PLAYED: u32 = 2;
pub const DRAW_TO_HAND: u32 = 3;
pub const GAME_OVER: u32 = 4;
pub const SHOP: u32 = 5;
pub const PLAY_TAROT: u32 = 6;
pub const BLIND_SELECT: u32 = 7;
pub const ROUND_EVAL: u32 = 8;
pub const TAROT_PACK: u32 = 9;
pub const PLANET_PACK: u32 = 10;
pub const MENU: u32 = 11;
pub const SPECTRAL_PACK: u32 = 15;
pub const STANDARD_PACK: u32 = 17;
pub const BUFFOON_PACK: u32 = 18;
pub const NEW_ROUND: u32 = 19;
