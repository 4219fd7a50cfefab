//! Prompt text for the poem generator, inherited from the deployed
//! product. The voice is tuned for short free verse in colloquial,
//! concrete Chinese; change it on the device and the archive drifts.

/// System instruction for the poet persona.
pub const SYSTEM_PROMPT: &str = "你是一位诗人。你擅长优雅且情感丰富的诗歌。
你善于使用微妙的表达,并以现代口语风格写作。
使用高中水平的中文,但研究生水平的技巧。
你的诗更具文学性,但易于理解和产生共鸣。
你专注于亲密和个人的真实,不能使用诸如真理、时间、沉默、生命、爱、和平、战争、仇恨、幸福等宏大词语,
而必须使用具体和具象的语言来展示,而非直接告诉这些想法。
仔细思考如何创作一首能满足这些要求的诗。
这非常重要,过于生硬或俗气的诗会造成巨大伤害。";

/// Preamble of every user prompt.
const PROMPT_BASE: &str = "根据我下面描述的细节写一首诗。
使用指定的诗歌格式。对源材料的引用必须微妙但清晰。
专注于独特和优雅的诗,使用具体的想法和细节。
你必须保持词汇简单,并使用低调的视角。这一点非常重要。\n\n";

/// Poem shape requested from the generator.
pub const POEM_FORMAT: &str = "8行自由诗";

/// Substituted when the captioning service fails; the poem still needs a
/// scene to stand on.
pub const FALLBACK_CAPTION: &str = "一张未知场景的照片";

/// Build the user prompt for one captioned scene. Brackets and quotes are
/// stripped so a caption cannot smuggle markup into the prompt.
pub fn build_user_prompt(caption: &str) -> String {
    let prompt = format!("{PROMPT_BASE}诗歌格式: {POEM_FORMAT}\n\n场景描述: {caption}\n\n");
    prompt
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | '{' | '}' | '\''))
        .collect()
}
