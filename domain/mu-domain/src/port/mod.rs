//! ポート（ヘキサゴナルアーキテクチャの境界）

pub mod driven;  // ドメインが外部に求める機能
pub mod driving; // 外部から呼び出されるユースケース
