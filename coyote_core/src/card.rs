use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

// --- 核心数据结构定义 ---

/// 牌的种类 (CardKind)
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum CardKind {
    Normal,  // 普通数字牌
    Reset,   // 数值为 0，亮出后整副牌重新洗牌
    Twice,   // 总和翻倍 (x2)
    MaxZero, // 最大的数字牌记为 0 (MAX→0)
    Wild,    // 从牌堆追加抽一张计入总和 (?)
}

/// 单张卡牌 (Card)
/// `value` 只对 `Normal` 和 `Reset` 有意义，特殊牌约定为 0。
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct Card {
    pub kind: CardKind,
    pub value: i32,
}

impl Card {
    pub fn new(kind: CardKind, value: i32) -> Card {
        Card { kind, value }
    }

    pub fn normal(value: i32) -> Card {
        Card { kind: CardKind::Normal, value }
    }

    pub fn special(kind: CardKind) -> Card {
        Card { kind, value: 0 }
    }

    /// 是否为参与求和的数字牌 (Normal 或 Reset)
    pub fn is_numeric(&self) -> bool {
        matches!(self.kind, CardKind::Normal | CardKind::Reset)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            CardKind::Normal | CardKind::Reset => write!(f, "{}", self.value),
            CardKind::Twice => write!(f, "x2"),
            CardKind::MaxZero => write!(f, "MAX→0"),
            CardKind::Wild => write!(f, "?"),
        }
    }
}

// --- 牌组构成与洗牌 ---

/// 一副完整牌组的张数
pub const DECK_SIZE: usize = 36;

/// 创建一副完整的 36 张牌 (未洗牌)
pub fn create_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(DECK_SIZE);
    deck.extend(
        [CardKind::Twice, CardKind::MaxZero, CardKind::Wild]
            .into_iter()
            .map(Card::special),
    );
    // 0 ~ 5 各 4 张，其中一张 0 是 Reset
    deck.push(Card::new(CardKind::Reset, 0));
    deck.extend(std::iter::repeat_n(Card::normal(0), 3));
    for value in 1..=5 {
        deck.extend(std::iter::repeat_n(Card::normal(value), 4));
    }
    for (value, count) in [(10, 3), (15, 2), (20, 1), (-5, 2), (-10, 1)] {
        deck.extend(std::iter::repeat_n(Card::normal(value), count));
    }
    deck
}

/// 用给定的随机源原地打乱任意序列 (Fisher–Yates，从后往前)
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

// --- 牌堆 ---

/// 牌堆 (Deck)：面朝下的抽牌堆和面朝上的弃牌堆
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Deck {
    draw_pile: VecDeque<Card>,
    discard_pile: Vec<Card>,
}

impl Deck {
    /// 一副洗好的完整牌组，弃牌堆为空
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Deck {
        let mut cards = create_deck();
        shuffle(&mut cards, rng);
        Deck { draw_pile: cards.into(), discard_pile: Vec::new() }
    }

    /// 按给定顺序直接构造牌堆，抽牌从 `draw_pile` 的头部开始
    pub fn from_piles(draw_pile: Vec<Card>, discard_pile: Vec<Card>) -> Deck {
        Deck { draw_pile: draw_pile.into(), discard_pile }
    }

    pub fn draw_pile(&self) -> impl Iterator<Item = &Card> {
        self.draw_pile.iter()
    }

    pub fn draw_pile_len(&self) -> usize {
        self.draw_pile.len()
    }

    pub fn discard_pile(&self) -> &[Card] {
        &self.discard_pile
    }

    /// 从抽牌堆顶抽一张。
    /// 抽完后若抽牌堆为空，立即把弃牌堆洗匀作为新的抽牌堆。
    ///
    /// # Panics
    /// 抽牌堆与弃牌堆同时为空时 panic。固定构成保证这不会发生。
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Card {
        if self.draw_pile.is_empty() {
            self.recycle_discards(rng);
        }
        let card = self
            .draw_pile
            .pop_front()
            .expect("抽牌堆和弃牌堆同时为空，牌组构成被破坏");
        if self.draw_pile.is_empty() {
            self.recycle_discards(rng);
        }
        card
    }

    /// 把牌按到达顺序放入弃牌堆
    pub fn discard(&mut self, cards: impl IntoIterator<Item = Card>) {
        self.discard_pile.extend(cards);
    }

    /// 把抽牌堆、弃牌堆以及调用方交回的在场牌全部合并重洗，弃牌堆清空
    pub fn reshuffle_full<R: Rng + ?Sized>(
        &mut self,
        in_play: impl IntoIterator<Item = Card>,
        rng: &mut R,
    ) {
        let mut cards: Vec<Card> = self.draw_pile.drain(..).collect();
        cards.append(&mut self.discard_pile);
        cards.extend(in_play);
        shuffle(&mut cards, rng);
        self.draw_pile = cards.into();
    }

    fn recycle_discards<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut cards = std::mem::take(&mut self.discard_pile);
        shuffle(&mut cards, rng);
        self.draw_pile = cards.into();
    }
}

// --- 单元测试 ---
