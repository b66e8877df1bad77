pub const ADJECTIVES: &[&str] = &[
    "agile", "amber", "bold", "brave", "bright", "brisk", "calm", "clever", "cosmic", "crisp",
    "daring", "eager", "fancy", "fierce", "gentle", "golden", "happy", "hardy", "humble", "jolly",
    "keen", "kind", "lively", "lucky", "mellow", "mighty", "nimble", "noble", "patient", "plucky",
    "proud", "quick", "quiet", "rapid", "rustic", "shiny", "silent", "sleek", "snappy", "solid",
    "spry", "steady", "sunny", "swift", "tidy", "vivid", "wise", "witty", "zany", "zesty",
];

pub const ANIMALS: &[&str] = &[
    "badger", "bear", "beaver", "bison", "cobra", "condor", "coyote", "crane", "dingo", "dolphin",
    "eagle", "falcon", "ferret", "fox", "gecko", "gibbon", "heron", "hippo", "ibex", "jackal",
    "jaguar", "koala", "lemur", "lion", "llama", "lynx", "marmot", "marten", "moose", "narwhal",
    "ocelot", "octopus", "orca", "otter", "owl", "panda", "panther", "puffin", "quokka", "raven",
    "salmon", "seal", "shark", "sloth", "tapir", "tiger", "toucan", "walrus", "wolf", "yak",
];
