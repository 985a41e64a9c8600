use crate::card::*;
use crate::error::GameError;
use crate::message::*;
use crate::state::*;
use tracing::{debug, info};

// --- 核心游戏流程 ---

impl Session {
    /// 玩家加入，只能在 `Lobby` 阶段进行。
    /// 新玩家立即摸一张牌，生命为初始生命。
    pub fn join(&mut self, actor: &Actor) -> Result<PlayerSummary, GameError> {
        if self.is_started() {
            return Err(GameError::AlreadyStarted);
        }
        if self.is_member(&actor.id) {
            return Err(GameError::AlreadyJoined);
        }
        if self.players.len() >= self.max_players {
            return Err(GameError::SessionFull(self.max_players));
        }

        let mut player = Player::new(actor.id, actor.name.clone(), self.starting_life);
        player.card = Some(self.deck.draw(&mut self.rng));
        let summary = player.summary();
        self.players.push(player);
        debug!(session = %self.key, player = %actor.id, "玩家加入");
        Ok(summary)
    }

    pub fn roster(&self) -> Vec<PlayerSummary> {
        self.players.iter().map(Player::summary).collect()
    }

    /// 开始游戏
    ///
    /// - 大厅阶段摸到的牌全部进入弃牌堆，再给每人发一张新牌。
    /// - 随机打乱玩家顺序 (与洗牌独立)。
    /// - 第一个行动者是打乱后的第一位。
    pub fn start(&mut self, actor: PlayerId) -> Result<TurnOrder, GameError> {
        if self.is_started() {
            return Err(GameError::AlreadyStarted);
        }
        if !self.is_member(&actor) {
            return Err(GameError::NotAMember);
        }
        if self.players.len() < 2 {
            return Err(GameError::TooFewPlayers);
        }

        let lobby_cards: Vec<Card> = self.players.iter_mut().filter_map(|p| p.card.take()).collect();
        self.deck.discard(lobby_cards);
        self.begin();
        info!(session = %self.key, players = self.players.len(), "游戏开始");
        self.turn_order().ok_or(GameError::TooFewPlayers)
    }

    fn begin(&mut self) {
        self.deal_cards();
        shuffle(&mut self.players, &mut self.rng);
        self.phase = SessionPhase::Active;
        self.caller_index = 0;
        self.declared_count = None;
    }

    fn deal_cards(&mut self) {
        for player in self.players.iter_mut() {
            player.card = Some(self.deck.draw(&mut self.rng));
        }
    }

    /// 当前的行动顺序，第一个行动者是 `caller_index` 处的玩家。
    /// 没有玩家时为 `None`。
    pub fn turn_order(&self) -> Option<TurnOrder> {
        let first_caller = self.players.get(self.caller_index)?.summary();
        Some(TurnOrder { order: self.roster(), first_caller })
    }

    /// 校验是否轮到该玩家行动
    fn ensure_turn(&self, actor: PlayerId) -> Result<(), GameError> {
        if self.phase != SessionPhase::Active {
            return Err(GameError::NotStarted);
        }
        if !self.is_member(&actor) {
            return Err(GameError::NotAMember);
        }
        if self.players[self.caller_index].id != actor {
            return Err(GameError::NotYourTurn);
        }
        Ok(())
    }

    /// 宣告一个数字
    ///
    /// 第一个数字至少为 1，之后必须严格大于当前数字。
    /// 成功后行动权循环移交给下一位玩家。
    pub fn declare_count(&mut self, actor: PlayerId, raw: &str) -> Result<TurnAdvance, GameError> {
        self.ensure_turn(actor)?;
        let count: i32 = raw
            .trim()
            .parse()
            .map_err(|_| GameError::NotANumber(raw.to_string()))?;
        match self.declared_count {
            None if count < 1 => return Err(GameError::BelowMinimum),
            Some(current) if count <= current => {
                return Err(GameError::MustExceedCurrent { current });
            }
            _ => {}
        }

        self.declared_count = Some(count);
        self.caller_index = (self.caller_index + 1) % self.players.len();
        let next_caller = self.players[self.caller_index].summary();
        debug!(session = %self.key, count, next = %next_caller.id, "宣告数字");
        Ok(TurnAdvance { count, next_caller })
    }

    /// 喊 "郊狼!"：亮牌、结算、淘汰，并准备下一回合
    ///
    /// 1. 有人持有 "?" 时从牌堆追加抽一张计入总和。
    /// 2. 计算总和 (见 [`compute_score`])。
    /// 3. 判定输家 (见 [`determine_loser`])。
    /// 4. 输家扣一条命，小于 0 则淘汰。
    /// 5. 亮出的牌进入弃牌堆；其中有 Reset 时整副牌重洗。
    /// 6. 只剩一人则决出胜者，否则以新的行动者为首重新发牌。
    pub fn call_coyote(&mut self, actor: PlayerId) -> Result<RoundReport, GameError> {
        self.ensure_turn(actor)?;
        let caller = self.players[self.caller_index].summary();
        let declared_count = self.declared_count;

        let revealed: Vec<RevealedCard> = self
            .players
            .iter()
            .filter_map(|p| p.card.map(|card| RevealedCard { player: p.summary(), card }))
            .collect();
        let mut cards: Vec<Card> = revealed.iter().map(|r| r.card).collect();

        // 1. 追加抽牌
        let wild_draw = if cards.iter().any(|c| c.kind == CardKind::Wild) {
            let card = self.deck.draw(&mut self.rng);
            cards.push(card);
            Some(card)
        } else {
            None
        };

        // 2. 计分
        let score = compute_score(&cards);

        // 3 & 4. 判定输家并更新生命
        let outcome = match determine_loser(declared_count, score, self.caller_index, self.players.len()) {
            None => RoundOutcome::Peaceful,
            Some(loser_idx) => self.apply_loss(loser_idx),
        };
        info!(
            session = %self.key,
            score,
            declared = ?declared_count,
            outcome = ?outcome,
            "郊狼结算"
        );

        // 5. 弃牌与重洗
        for player in self.players.iter_mut() {
            player.card = None;
        }
        self.deck.discard(cards.iter().copied());
        let reshuffled = cards.iter().any(|c| c.kind == CardKind::Reset);
        if reshuffled {
            self.deck.reshuffle_full(std::iter::empty(), &mut self.rng);
            info!(session = %self.key, "亮出 Reset，整副牌重洗");
        }

        // 6. 回合或游戏结束
        self.declared_count = None;
        let mut report = RoundReport {
            caller,
            declared_count,
            revealed,
            wild_draw,
            score,
            outcome,
            reshuffled,
            winner: None,
            restarted: false,
            next_round: None,
        };

        if self.players.len() == 1 {
            let winner = self.players[0].summary();
            info!(session = %self.key, winner = %winner.id, "决出胜者");
            report.winner = Some(winner);
            self.phase = SessionPhase::Complete;
            self.caller_index = 0;
            if self.auto_restart_on_win {
                report.next_round = self.restart();
                report.restarted = true;
            }
        } else {
            self.players.rotate_left(self.caller_index);
            self.caller_index = 0;
            self.deal_cards();
            report.next_round = self.turn_order();
        }

        Ok(report)
    }

    /// 输家扣一条命，生命小于 0 时淘汰
    fn apply_loss(&mut self, loser_idx: usize) -> RoundOutcome {
        let remaining = self.players.len();
        let loser = &mut self.players[loser_idx];
        loser.life -= 1;
        let life = loser.life;
        let summary = loser.summary();

        if life < 0 {
            *loser.history.entry(remaining).or_insert(0) += 1;
            let out = self.players.remove(loser_idx);
            self.eliminated_players.push(out);
            if self.caller_index >= self.players.len() {
                self.caller_index = 0;
            }
            info!(session = %self.key, player = %summary.id, rank = remaining, "玩家淘汰");
            RoundOutcome::Lost { loser: summary, life, eliminated: true }
        } else {
            self.caller_index = loser_idx;
            RoundOutcome::Lost { loser: summary, life, eliminated: false }
        }
    }

    /// 决出胜者后原地重开：淘汰的玩家回到座位，所有人恢复初始生命，
    /// 换一副完整的新牌后重新开始。淘汰记录保留。
    pub fn restart(&mut self) -> Option<TurnOrder> {
        self.players.append(&mut self.eliminated_players);
        for player in self.players.iter_mut() {
            player.card = None;
            player.life = self.starting_life;
        }
        self.deck = Deck::new(&mut self.rng);
        self.begin();
        info!(session = %self.key, players = self.players.len(), "游戏重开");
        self.turn_order()
    }

    // --- 查询 ---

    /// 除自己之外所有存活玩家的牌
    pub fn visible_cards(&self, actor: PlayerId) -> Result<Vec<RevealedCard>, GameError> {
        if self.phase != SessionPhase::Active {
            return Err(GameError::NotStarted);
        }
        if !self.is_member(&actor) {
            return Err(GameError::NotAMember);
        }
        Ok(self
            .players
            .iter()
            .filter(|p| p.id != actor)
            .filter_map(|p| p.card.map(|card| RevealedCard { player: p.summary(), card }))
            .collect())
    }

    pub fn life_report(&self) -> LifeReport {
        LifeReport {
            alive: self
                .players
                .iter()
                .map(|p| LifeEntry { player: p.summary(), life: p.life })
                .collect(),
            eliminated: self.eliminated_players.iter().map(Player::summary).collect(),
        }
    }

    pub fn discard_report(&self) -> DiscardReport {
        let mut values: Vec<i32> = self
            .deck
            .discard_pile()
            .iter()
            .filter(|c| c.is_numeric())
            .map(|c| c.value)
            .collect();
        values.sort();

        let mut numbers: Vec<Vec<i32>> = Vec::new();
        for value in values {
            match numbers.last_mut() {
                Some(group) if group[0] == value => group.push(value),
                _ => numbers.push(vec![value]),
            }
        }

        DiscardReport {
            numbers,
            specials: self.deck.discard_pile().iter().filter(|c| !c.is_numeric()).copied().collect(),
        }
    }
}

/// 宣告数字成功后的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnAdvance {
    pub count: i32,
    pub next_caller: PlayerSummary,
}

// --- 结算规则 ---

/// 计算亮出的所有牌的总和
///
/// - 有 MAX→0 时：只看数字牌，去掉最大的一张后求和。
/// - 否则所有牌求和 (特殊牌为 0)。
/// - 有 x2 时，上面的结果翻倍。
pub fn compute_score(revealed: &[Card]) -> i32 {
    let doubled = revealed.iter().any(|c| c.kind == CardKind::Twice);

    let sum: i32 = if revealed.iter().any(|c| c.kind == CardKind::MaxZero) {
        let mut values: Vec<i32> = revealed.iter().filter(|c| c.is_numeric()).map(|c| c.value).collect();
        // 从大到小排序，去掉最大的一张
        values.sort_by(|a, b| b.cmp(a));
        values.iter().skip(1).sum()
    } else {
        revealed.iter().filter(|c| c.is_numeric()).map(|c| c.value).sum()
    };

    if doubled { sum * 2 } else { sum }
}

/// 判定本回合的输家在行动顺序中的索引，`None` 表示无人失分
///
/// - 没人宣告过数字：总和 <= 0 则无人失分，否则喊郊狼的人输。
/// - 宣告的数字大于总和：上一个宣告的人 (喊郊狼者的前一位) 输。
/// - 否则喊郊狼的人输。
pub fn determine_loser(
    declared_count: Option<i32>,
    score: i32,
    caller_index: usize,
    player_count: usize,
) -> Option<usize> {
    match declared_count {
        None if score <= 0 => None,
        None => Some(caller_index),
        Some(count) if count > score => Some(if caller_index > 0 { caller_index - 1 } else { player_count - 1 }),
        Some(_) => Some(caller_index),
    }
}

// --- 单元测试 ---
