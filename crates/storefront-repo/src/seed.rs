use storefront_types::domain::food::{parse_tags, Food};

fn menu_item(
    id: &str,
    name: &str,
    description: &str,
    price: i64,
    image: &str,
    tag: &str,
    details: (&str, &str, &str, f64),
) -> Food {
    let (weight, calories, vitamins, rating) = details;
    Food {
        id: id.into(),
        name: name.into(),
        description: description.into(),
        price,
        image: image.into(),
        category: "salad".into(),
        tags: parse_tags(tag),
        vitamins: Some(vitamins.into()),
        weight: Some(weight.into()),
        calories: Some(calories.into()),
        rating: Some(rating),
    }
}

/// The house menu used to populate an empty catalog.
pub fn demo_catalog() -> Vec<Food> {
    vec![
        menu_item(
            "waldorf-salad",
            "Waldorf Salad",
            "Apel merah, anggur merah & hijau, seledri, kenari, yogurt, mayones rendah lemak.",
            80000,
            "/assets/waldorf_salad.svg",
            "savory",
            ("250 g", "300 kcal", "Vit C, A, E", 4.5),
        ),
        menu_item(
            "greek-salad",
            "Greek Salad",
            "Tomat, mentimun, paprika, bawang merah, zaitun hitam, keju feta, olive oil",
            85000,
            "/assets/greek_salad.png",
            "savory",
            ("280 g", "220 kcal", "Vit A, C, K", 4.7),
        ),
        menu_item(
            "italian-pasta-salad",
            "Italian Pasta Salad",
            "Pasta, tomat ceri, paprika, bawang merah, mozzarella, kemangi, zaitun.",
            90000,
            "/assets/pasta_salad.svg",
            "sour",
            ("300 g", "350 kcal", "Vit A, C", 4.6),
        ),
    ]
}
