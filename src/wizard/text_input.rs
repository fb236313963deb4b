/// 1行のテキスト入力欄。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextInput {
    value: String,
    char_limit: Option<usize>,
}

impl TextInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// 入力できる文字数を制限した入力欄を返す。
    pub fn with_limit(char_limit: usize) -> Self {
        Self {
            value: String::new(),
            char_limit: Some(char_limit),
        }
    }

    /// 初期値を設定する。文字数の上限を超える部分は切り捨てる。
    pub fn with_value(mut self, value: &str) -> Self {
        self.value = match self.char_limit {
            Some(limit) => value.chars().take(limit).collect(),
            None => value.to_string(),
        };
        self
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// 末尾に1文字追加する。上限に達している場合は`false`を返す。
    pub fn insert(&mut self, c: char) -> bool {
        if c.is_control() {
            return false;
        }
        if let Some(limit) = self.char_limit {
            if self.value.chars().count() >= limit {
                return false;
            }
        }
        self.value.push(c);
        true
    }

    /// 末尾の1文字を削除する。
    pub fn backspace(&mut self) -> bool {
        self.value.pop().is_some()
    }
}
