//! Words for passphrases and fingerprint phrases.

use sha2::{Digest, Sha256};

pub(super) const WORDS: &[&str] = &[
    "abacus", "abbey", "abdomen", "ability", "abrasion", "absence", "academy", "acorn", "acrobat",
    "action", "actress", "adapter", "address", "adobe", "advent", "aerial", "affair", "agenda",
    "aircraft", "alarm", "album", "alchemy", "alfalfa", "alibi", "alley", "almanac", "alpaca",
    "amber", "amulet", "anchor", "anthem", "antler", "apple", "apricot", "aquarium", "arbor",
    "arcade", "archer", "arena", "armada", "armchair", "aroma", "arrow", "artist", "ascent",
    "aspen", "atlas", "attic", "auburn", "autumn", "avocado", "awning", "axis", "azalea",
    "backpack", "badge", "bagel", "balcony", "ballad", "bamboo", "banjo", "banner", "barley",
    "barrel", "basil", "basin", "basket", "beacon", "beetle", "bellow", "bench", "berry", "bicycle",
    "biscuit", "blanket", "blossom", "bobcat", "bonfire", "bonsai", "border", "bottle", "boulder",
    "bracket", "breeze", "bridge", "brook", "bucket", "buffalo", "bugle", "bundle", "burrow",
    "butter", "cabin", "cactus", "camera", "canal", "candle", "canoe", "canyon", "caramel", "cargo",
    "carpet", "castle", "catalog", "cedar", "cellar", "cement", "century", "chalk", "channel",
    "chapel", "cherry", "chimney", "cinnamon", "circus", "citrus", "clover", "cobalt", "coconut",
    "comet", "compass", "copper", "coral", "cotton", "cradle", "crater", "crayon", "cricket",
    "crystal", "cupboard", "cypress", "daisy", "dancer", "delta", "desert", "diamond", "dolphin",
    "domino", "dragon", "drizzle", "dune", "eagle", "easel", "echo", "eclipse", "elbow", "ember",
    "emerald", "engine", "equator", "falcon", "feather", "fern", "ferry", "fiddle", "fjord",
    "flannel", "flute", "forest", "fossil", "fountain", "galaxy", "garden", "garnet", "geyser",
    "ginger", "glacier", "globe", "gondola", "granite", "gravel", "guitar", "hammock", "harbor",
    "harvest", "hazel", "helmet", "heron", "hickory", "horizon", "iceberg", "igloo", "indigo",
    "island", "ivory", "jacket", "jasmine", "jigsaw", "journey", "juniper", "kayak", "kettle",
    "kiwi", "lagoon", "lantern", "lava", "lemon", "library", "lilac", "linen", "lizard", "lobster",
    "locket", "lotus", "magnet", "mango", "maple", "marble", "meadow", "melody", "meteor", "mirror",
    "mosaic", "mountain", "mustard", "napkin", "nectar", "nutmeg", "oasis", "ocean", "olive",
    "orchard", "origami", "otter", "paddle", "pebble", "pepper", "piano", "pillow", "pioneer",
    "planet", "plaza", "pocket", "prairie", "pumpkin", "quartz", "quill", "rabbit", "radar",
    "raven", "ribbon", "river", "rocket", "saddle", "saffron", "sandal", "scarf", "sequoia",
    "shadow", "shelter", "silver", "sketch", "sparrow", "spruce", "summit", "sunrise", "tablet",
    "teapot", "thunder", "timber", "tulip", "tundra", "turtle", "valley", "velvet", "violet",
    "voyage", "walnut", "willow", "window", "winter", "yogurt", "zephyr",
];

/// Five words derived from a digest of `material`. The same input always gives the same phrase.
pub(super) fn fingerprint_phrase(material: &[u8]) -> String {
    let hash = Sha256::digest(material);
    hash.chunks_exact(2)
        .take(5)
        .map(|pair| WORDS[usize::from(u16::from_be_bytes([pair[0], pair[1]])) % WORDS.len()])
        .collect::<Vec<_>>()
        .join("-")
}
