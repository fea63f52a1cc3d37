//! Bilingual keyword hints per category and beauty sub-category.

use clipdrop_models::{BeautySubCategory, Category};

const BEAUTY: &[&str] = &[
    "makeup", "cosmetic", "cosmetics", "lipstick", "lipgloss", "foundation", "mascara", "eyeliner",
    "eyeshadow", "blush", "concealer", "skincare", "serum", "moisturizer", "cream", "lotion",
    "toner", "sunscreen", "cleanser", "facial", "nail", "perfume", "toothpaste", "toothbrush",
    "mouthwash", "whitening", "美妆", "化妆", "彩妆", "护肤", "口红", "面霜", "精华", "美容",
    "牙膏", "口腔",
];

const FITNESS: &[&str] = &[
    "workout", "gym", "exercise", "yoga", "pilates", "cardio", "hiit", "training", "running",
    "muscle", "squat", "abs", "stretch", "dumbbell", "treadmill", "健身", "运动", "瑜伽", "锻炼",
    "跑步", "减脂",
];

const HAIRCARE: &[&str] = &[
    "shampoo", "conditioner", "hairstyle", "haircut", "hairdryer", "salon", "scalp", "curl",
    "braid", "洗发", "护发", "发型", "美发", "头发",
];

const BUSINESS: &[&str] = &[
    "startup", "entrepreneur", "marketing", "finance", "investing", "sales", "office", "meeting",
    "productivity", "ecommerce", "brand", "leadership", "商业", "创业", "营销", "理财", "职场",
    "电商",
];

const LIFESTYLE: &[&str] = &[
    "vlog", "travel", "food", "cooking", "recipe", "home", "fashion", "daily", "routine",
    "family", "pets", "生活", "日常", "旅行", "美食", "穿搭", "家居",
];

const SKINCARE: &[&str] = &[
    "skincare", "skin", "serum", "moisturizer", "cream", "lotion", "toner", "sunscreen",
    "cleanser", "facial", "mask", "acne", "护肤", "面霜", "精华", "面膜", "皮肤",
];

const HAIRCARE_SUB: &[&str] = &[
    "haircare", "hair", "shampoo", "conditioner", "scalp", "洗发", "护发", "头发",
];

const ORALCARE: &[&str] = &[
    "oral", "teeth", "tooth", "toothpaste", "toothbrush", "mouthwash", "floss", "whitening",
    "牙膏", "牙刷", "口腔", "牙齿",
];

/// Hint keywords for a category.
pub fn category_hints(category: Category) -> &'static [&'static str] {
    match category {
        Category::Beauty => BEAUTY,
        Category::Fitness => FITNESS,
        Category::Haircare => HAIRCARE,
        Category::Business => BUSINESS,
        Category::Lifestyle => LIFESTYLE,
    }
}

/// Hint keywords for a beauty sub-category.
pub fn sub_category_hints(sub: BeautySubCategory) -> &'static [&'static str] {
    match sub {
        BeautySubCategory::Skincare => SKINCARE,
        BeautySubCategory::Haircare => HAIRCARE_SUB,
        BeautySubCategory::Oralcare => ORALCARE,
    }
}
