//! Prompt templates, written in Traditional Chinese for the shop's clients.

use tracker_types::{Order, OrderStatus};

pub const NO_UPDATE_FALLBACK: &str = "無法產生回覆。";
pub const NO_PLAN_FALLBACK: &str = "無法產生計畫。";

/// Shop-facing label of a status, as the artist talks about it.
pub fn status_label(status: OrderStatus) -> &'static str {
	match status {
		OrderStatus::Applying => "申請中",
		OrderStatus::InDiscussion => "討論中",
		OrderStatus::DepositPaid => "已付訂金",
		OrderStatus::Queued => "排單中",
		OrderStatus::InProduction => "送印製作",
		OrderStatus::Completed => "已完成",
		OrderStatus::Shipped => "已寄出",
	}
}

pub fn client_update(order: &Order) -> String {
	let status = status_label(order.status);
	format!(
		"你是一位專業且親切的流麻訂製店主小幫手。\n\
		 請用**繁體中文**為委託人 \"{client}\" 寫一則簡短、有禮貌的進度回報訊息。\n\
		 \n\
		 訂單資訊：\n\
		 - 標題: {title}\n\
		 - 目前狀態: {status}\n\
		 - 類型: {kind}\n\
		 \n\
		 語氣要親切但專業。\n\
		 提到目前的 \"{status}\" 階段進展順利。\n\
		 如果狀態是 \"{queued}\"，請感謝他們的耐心等待。\n\
		 如果狀態是 \"{production}\"，可以告知已送廠，並預告大約的製作週期。\n\
		 如果狀態是 \"{shipped}\"，請告知訂單已出貨，並提醒他們留意包裹。\n\
		 字數控制在 100 字以內。",
		client = order.client_name,
		title = order.title,
		status = status,
		kind = order.order_type,
		queued = status_label(OrderStatus::Queued),
		production = status_label(OrderStatus::InProduction),
		shipped = status_label(OrderStatus::Shipped),
	)
}

pub fn work_plan(order: &Order) -> String {
	format!(
		"我是一位流麻客製化創作者。請針對這筆訂單，提供我 3 個具體的下一步工作建議清單。\n\
		 請用**繁體中文**回答。\n\
		 \n\
		 訂單類型: {kind}\n\
		 描述: {description}\n\
		 目前階段: {status}\n\
		 \n\
		 請提供 3 個簡潔、可執行的點列式建議，幫助我推進到下一個階段。\
		 例如，如果處於\"{discussion}\"，建議可以是\"規劃壓克力切割線與孔位\"；\
		 如果處於\"{production}\"，建議可以是\"準備包裝材料\"。",
		kind = order.order_type,
		description = order.description,
		status = status_label(order.status),
		discussion = status_label(OrderStatus::InDiscussion),
		production = status_label(OrderStatus::InProduction),
	)
}
