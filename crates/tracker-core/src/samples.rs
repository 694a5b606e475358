//! Built-in sample orders and the default catalog.
//!
//! Both are written to an empty backend on first connection and served when
//! the backend cannot be reached.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use tracker_types::{Addon, Catalog, Order, OrderStatus, OrderType, ProductVariant};

/// Artist tag of the sample orders.
pub const SAMPLE_ARTIST: &str = "麻糬流麻";

static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog);

/// The built-in catalog.
pub fn default_catalog() -> &'static Catalog {
	&DEFAULT_CATALOG
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
	NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

#[allow(clippy::too_many_arguments)]
fn sample(
	id: &str,
	client_name: &str,
	title: &str,
	description: &str,
	order_type: OrderType,
	price: u32,
	status: OrderStatus,
	dates: (NaiveDate, NaiveDate),
	thumbnail_url: &str,
) -> Order {
	Order {
		id: id.to_string(),
		artist_id: SAMPLE_ARTIST.to_string(),
		client_name: client_name.to_string(),
		contact: None,
		title: title.to_string(),
		description: description.to_string(),
		order_type,
		price,
		status,
		date_added: dates.0,
		last_updated: dates.1,
		notes: None,
		thumbnail_url: Some(thumbnail_url.to_string()),
	}
}

/// The four sample orders.
pub fn sample_orders() -> Vec<Order> {
	vec![
		sample(
			"c-101",
			"小星",
			"OC 貓耳少女雙人吊飾",
			"雙層雙面，愛心形狀。入油：粉色 + 白色亮片。配件：貓咪形狀的金色D扣。",
			OrderType::Charm,
			850,
			OrderStatus::InProduction,
			(date(2023, 10, 25), date(2023, 11, 2)),
			"https://picsum.photos/400/400?random=1",
		),
		sample(
			"c-102",
			"阿光",
			"遊戲角色印象立牌",
			"角色在星空下的場景。底座印花為星象盤。希望有星星和月亮形狀的亮片。",
			OrderType::Stand,
			1200,
			OrderStatus::DepositPaid,
			(date(2023, 10, 28), date(2023, 10, 30)),
			"https://picsum.photos/400/300?random=2",
		),
		sample(
			"c-103",
			"Momo",
			"寵物兔兔紀念流麻磚",
			"需要根據提供的寵物照片繪製Q版。整體色調為溫暖的米白色。內部亮片想要胡蘿蔔形狀的。",
			OrderType::Brick,
			1500,
			OrderStatus::Queued,
			(date(2023, 11, 1), date(2023, 11, 1)),
			"https://picsum.photos/400/250?random=3",
		),
		sample(
			"c-104",
			"Viper007",
			"原創機甲主題吊飾",
			"單層透明壓克力，背景有科技感的線條。藍色入油 + 銀色六角形亮片。",
			OrderType::Charm,
			700,
			OrderStatus::Completed,
			(date(2023, 10, 20), date(2023, 10, 29)),
			"https://picsum.photos/400/400?random=4",
		),
	]
}

fn variant(name: &str, price: u32, seed: &str, addons: &[(&str, u32)]) -> ProductVariant {
	ProductVariant::new(name, price)
		.with_img(format!("https://picsum.photos/seed/{}/400", seed))
		.with_addons(
			addons
				.iter()
				.map(|(name, price)| Addon::new(*name, *price))
				.collect(),
		)
}

const GLITTER: (&str, u32) = ("特殊亮片", 30);
const PET_TAPE: (&str, u32) = ("PET膠帶", 20);
const SAND_LAYERS: (&str, u32) = ("多層流沙層", 50);
const OIL_SPEED: (&str, u32) = ("流沙油速", 10);
const SPARKLE: (&str, u32) = ("閃粉數量", 10);
const TAG: (&str, u32) = ("吊牌款式", 40);
const STAND: (&str, u32) = ("立牌款式", 60);
const MAGNET: (&str, u32) = ("磁吸款", 40);
const TWO_TONE: (&str, u32) = ("雙色款", 50);

fn build_default_catalog() -> Catalog {
	let mut catalog = Catalog::new();
	catalog.set_category(
		"正方形",
		vec![
			variant("5x5cm正方形", 120, "sq1", &[GLITTER, PET_TAPE, SAND_LAYERS, OIL_SPEED, TAG]),
			variant("6x6cm正方形", 120, "sq2", &[GLITTER, PET_TAPE, SAND_LAYERS, OIL_SPEED, SPARKLE]),
			variant("8x8cm正方形", 120, "sq3", &[GLITTER, PET_TAPE, SAND_LAYERS, OIL_SPEED, SPARKLE]),
			variant(
				"10x10cm正方形",
				120,
				"sq4",
				&[GLITTER, PET_TAPE, SAND_LAYERS, OIL_SPEED, SPARKLE, TAG, STAND],
			),
		],
	);
	catalog.set_category(
		"長方形",
		vec![
			variant("3x4cm長方形", 120, "rect1", &[GLITTER, PET_TAPE, TAG]),
			variant("4x6cm長方形", 150, "rect2", &[GLITTER, PET_TAPE]),
			variant(
				"5.5x8.5cm長方形",
				200,
				"rect3",
				&[SAND_LAYERS, STAND, OIL_SPEED, SPARKLE, GLITTER, TAG, PET_TAPE, MAGNET],
			),
			variant("7x10cm長方形", 250, "rect4", &[SAND_LAYERS, OIL_SPEED, SPARKLE, GLITTER, PET_TAPE]),
			variant("7x20cm長方形", 300, "rect5", &[OIL_SPEED, GLITTER, SPARKLE, PET_TAPE]),
			variant("7x21cm長方形", 300, "rect6", &[OIL_SPEED, GLITTER, SPARKLE, PET_TAPE]),
			variant(
				"7.5x13cm長方形",
				250,
				"rect7",
				&[SAND_LAYERS, OIL_SPEED, SPARKLE, GLITTER, PET_TAPE, MAGNET, STAND],
			),
			variant("8x21cm長方形", 320, "rect8", &[OIL_SPEED, GLITTER, SPARKLE, PET_TAPE]),
			variant(
				"10x15cm長方形",
				270,
				"rect9",
				&[SAND_LAYERS, OIL_SPEED, SPARKLE, GLITTER, PET_TAPE, MAGNET, TWO_TONE],
			),
		],
	);
	catalog.set_category(
		"圓形",
		vec![
			variant("5cm圓形", 120, "circ1", &[GLITTER, PET_TAPE, OIL_SPEED]),
			variant("6cm圓形", 150, "circ2", &[GLITTER, PET_TAPE, OIL_SPEED]),
			variant("8cm圓形", 180, "circ3", &[GLITTER, PET_TAPE, OIL_SPEED, STAND]),
			variant("10cm圓形", 220, "circ4", &[GLITTER, PET_TAPE, OIL_SPEED, STAND]),
		],
	);
	catalog.set_category(
		"異形",
		vec![
			// Priced per design.
			variant("7.5x15cm圓頂彩窗", 0, "spec1", &[OIL_SPEED, GLITTER, SPARKLE, PET_TAPE]),
			variant("7x15cm票根", 270, "spec2", &[GLITTER, OIL_SPEED, SPARKLE, PET_TAPE]),
			variant("7x20cm票根", 300, "spec3", &[GLITTER, OIL_SPEED, SPARKLE, PET_TAPE, TWO_TONE]),
			variant("通行證", 170, "spec4", &[OIL_SPEED, GLITTER, SPARKLE]),
			variant("異形總覽", 100, "spec5", &[STAND, TAG, OIL_SPEED, GLITTER, SPARKLE, PET_TAPE]),
		],
	);
	catalog.set_category(
		"徽章磚",
		vec![
			variant("58mm徽章磚", 200, "badge1", &[GLITTER, OIL_SPEED, PET_TAPE, STAND]),
			variant("75mm徽章磚", 240, "badge2", &[GLITTER, OIL_SPEED, PET_TAPE, STAND]),
		],
	);
	catalog.set_category(
		"雙色磚",
		vec![
			variant("雙色流麻磚 (常規)", 300, "twotone1", &[GLITTER, OIL_SPEED, PET_TAPE, MAGNET]),
			variant("漸層雙色磚", 350, "twotone2", &[GLITTER, OIL_SPEED, PET_TAPE, MAGNET]),
		],
	);
	catalog
}
