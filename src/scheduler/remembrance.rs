//! Post-prayer remembrance texts shown during the remembrance phase

/// Default ordered list, shown one at a time after each prayer
pub const DEFAULT_REMEMBRANCE: [&str; 11] = [
    "أستغفر الله، أستغفر الله، أستغفر الله.\n\nاللهم أنت السلام ومنك السلام، تباركت يا ذا الجلال والإكرام.",
    "لا إله إلا الله وحده لا شريك له، له الملك وله الحمد، وهو على كل شيء قدير،\n\nاللهم لا مانع لما أعطيت، ولا معطي لما منعت، ولا ينفع ذا الجد منك الجد.",
    "لا إله إلا الله وحده لا شريك له، له الملك وله الحمد، وهو على كل شيء قدير،\n\nلا حول ولا قوة إلا بالله، لا إله إلا الله، ولا نعبد إلا إياه، له النعمة وله الفضل وله الثناء الحسن، لا إله إلا الله مخلصين له الدين ولو كره الكافرون.",
    "لا إله إلا الله وحده لا شريك له، له الملك وله الحمد، يحيي ويميت وهو على كل شيء قدير.",
    "اللهم إني أسألك علما نافعا، ورزقا طيبا، وعملا متقبلا.",
    "اللهم أجرني من النار.\n\n(بعد صلاة الصبح والمغرب)",
    "اللهم أعني على ذكرك وشكرك وحسن عبادتك.\n\n(ثلاث مرات بعد صلاتي الفجر والمغرب)",
    "أعوذ بالله من الشيطان الرجيم\n\nالله لا إله إلا هو الحي القيوم لا تأخذه سنة ولا نوم له ما في السماوات وما في الأرض من ذا الذي يشفع عنده إلا بإذنه يعلم ما بين أيديهم وما خلفهم ولا يحيطون بشيء من علمه إلا بما شاء وسع كرسيه السماوات والأرض ولا يئوده حفظهما وهو العلي العظيم.\n\n[آية الكرسي - البقرة 255]",
    "بسم الله الرحمن الرحيم\n\nقل هو الله أحد، الله الصمد، لم يلد ولم يولد، ولم يكن له كفوا أحد.\n\n[سورة الإخلاص]",
    "بسم الله الرحمن الرحيم\n\nقل أعوذ برب الفلق، من شر ما خلق، ومن شر غاسق إذا وقب، ومن شر النفاثات في العقد، ومن شر حاسد إذا حسد.\n\n[سورة الفلق]",
    "بسم الله الرحمن الرحيم\n\nقل أعوذ برب الناس، ملك الناس، إله الناس، من شر الوسواس الخناس، الذي يوسوس في صدور الناس، من الجنة والناس.\n\n[سورة الناس]\n\n(ثلاث مرات بعد صلاتي الفجر والمغرب)",
];

/// Owned copy of the default list, as stored in configuration
pub fn default_texts() -> Vec<String> {
    DEFAULT_REMEMBRANCE.iter().map(|s| s.to_string()).collect()
}
