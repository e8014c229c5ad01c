//! Shared UI icons and emojis.

use console::Emoji;

pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static STOP: Emoji<'_, '_> = Emoji("⏹️  ", "[STOP]");
pub static RESUME: Emoji<'_, '_> = Emoji("🔄 ", "[RESUME]");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">>");
