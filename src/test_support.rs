// Shared fixtures for unit tests

use chrono::{TimeZone, Utc};

use crate::models::{Listing, ListingImage, ListingStatus};

pub fn listing(id: &str, price: f64) -> Listing {
    Listing {
        id: id.to_string(),
        title: format!("Ônibus rodoviário {}", id),
        description: "Revisado, pronto para rodar".to_string(),
        price,
        brand: "Volvo".to_string(),
        model: "B270F".to_string(),
        year: 2015,
        mileage: Some(150_000),
        fuel: Some("Diesel".to_string()),
        transmission: Some("Manual".to_string()),
        capacity: Some(44),
        location: Some("São Paulo, SP".to_string()),
        whatsapp: Some("+55 11 99999-0000".to_string()),
        featured: false,
        status: ListingStatus::Active,
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        images: vec![
            ListingImage {
                id: format!("{}-img-0", id),
                url: format!("https://cdn.example/{}/0.jpg", id),
                public_id: Some(format!("busmarket/{}-0", id)),
                order: 0,
            },
            ListingImage {
                id: format!("{}-img-1", id),
                url: format!("https://cdn.example/{}/1.jpg", id),
                public_id: None,
                order: 1,
            },
        ],
    }
}

/// Six listings with distinct sort keys: two featured, one sold, one
/// without mileage.
pub fn fleet() -> Vec<Listing> {
    let mut paradiso = listing("paradiso", 720_000.0);
    paradiso.title = "Marcopolo Paradiso G7 1800 DD".into();
    paradiso.brand = "Scania".into();
    paradiso.model = "K440".into();
    paradiso.year = 2021;
    paradiso.mileage = Some(90_000);
    paradiso.transmission = Some("Automatizada".into());
    paradiso.featured = true;
    paradiso.created_at = Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap();

    let mut irizar = listing("irizar", 480_000.0);
    irizar.title = "Irizar i6 executivo".into();
    irizar.brand = "Mercedes-Benz".into();
    irizar.model = "O500 RS".into();
    irizar.year = 2019;
    irizar.mileage = Some(310_000);
    irizar.location = Some("Curitiba, PR".into());
    irizar.created_at = Utc.with_ymd_and_hms(2024, 4, 2, 15, 30, 0).unwrap();

    let mut micro = listing("micro", 85_000.0);
    micro.title = "Micro-ônibus Volare W9".into();
    micro.brand = "Volare".into();
    micro.model = "W9".into();
    micro.year = 2012;
    micro.mileage = None;
    micro.transmission = Some("Manual".into());
    micro.created_at = Utc.with_ymd_and_hms(2024, 1, 20, 8, 0, 0).unwrap();

    let mut urbano = listing("urbano", 150_000.0);
    urbano.title = "Caio Apache Vip urbano".into();
    urbano.model = "B290R".into();
    urbano.year = 2016;
    urbano.mileage = Some(420_000);
    urbano.featured = true;
    urbano.created_at = Utc.with_ymd_and_hms(2024, 2, 14, 10, 0, 0).unwrap();

    let mut eletrico = listing("eletrico", 600_000.0);
    eletrico.title = "BYD D9W elétrico".into();
    eletrico.brand = "BYD".into();
    eletrico.model = "D9W".into();
    eletrico.year = 2023;
    eletrico.mileage = Some(12_000);
    eletrico.fuel = Some("Elétrico".into());
    eletrico.transmission = Some("Automática".into());
    eletrico.created_at = Utc.with_ymd_and_hms(2024, 6, 1, 18, 45, 0).unwrap();

    let mut vendido = listing("vendido", 200_000.0);
    vendido.title = "Comil Campione vendido".into();
    vendido.status = ListingStatus::Sold;
    vendido.created_at = Utc.with_ymd_and_hms(2024, 6, 5, 7, 0, 0).unwrap();

    vec![paradiso, irizar, micro, urbano, eletrico, vendido]
}
