//! Per-language word lists for temporal analysis
//!
//! Weekdays, months, relative day words, quantity words, the
//! past/future modifiers checked immediately around a date expression,
//! and the tensed verb forms scanned in the wider sentence window.

use chrono::Weekday;

/// Languages the enricher understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Spanish,
    English,
    Portuguese,
}

impl Language {
    /// Parse an ISO 639-1 code; unknown codes are skipped by callers.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "es" => Some(Language::Spanish),
            "en" => Some(Language::English),
            "pt" => Some(Language::Portuguese),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::Spanish => "es",
            Language::English => "en",
            Language::Portuguese => "pt",
        }
    }
}

/// Date words short enough to fail the length filter but still valid.
pub fn valid_short_patterns(language: Language) -> &'static [&'static str] {
    match language {
        Language::Spanish => &[
            "hoy", "ayer", "anteayer", "mañana", "pasado mañana",
            "lunes", "martes", "miércoles", "jueves", "viernes", "sábado", "domingo",
            "semana", "mes", "año", "ahora", "luego", "después", "antes",
        ],
        Language::English => &[
            "today", "tomorrow", "yesterday",
            "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
            "week", "month", "year", "now", "later", "soon", "before", "after",
        ],
        Language::Portuguese => &[
            "hoje", "ontem", "anteontem", "amanhã", "depois de amanhã",
            "segunda", "segunda-feira", "terça", "terça-feira",
            "quarta", "quarta-feira", "quinta", "quinta-feira",
            "sexta", "sexta-feira", "sábado", "domingo",
            "semana", "mês", "ano", "agora", "logo", "depois", "antes", "já",
        ],
    }
}

/// Past modifiers checked immediately AFTER the date expression.
pub fn past_modifiers_after(language: Language) -> &'static [&'static str] {
    match language {
        Language::Spanish => &[
            "pasado", "pasada", "pasados", "pasadas",
            "anterior", "anteriores", "antepasado", "antepasada", "atrás",
        ],
        Language::English => &["ago", "back", "earlier", "before", "prior"],
        Language::Portuguese => &[
            "passado", "passada", "passados", "passadas",
            "anterior", "anteriores", "atrás", "retrasado", "retrasada",
        ],
    }
}

/// Past modifiers checked immediately BEFORE the date expression.
pub fn past_modifiers_before(language: Language) -> &'static [&'static str] {
    match language {
        Language::Spanish => &[
            "el pasado", "la pasada", "los pasados", "las pasadas",
            "el último", "la última", "los últimos", "las últimas",
            "el anterior", "la anterior", "el otro", "la otra",
            "hace", "ya",
        ],
        Language::English => &[
            "last", "past", "previous", "prior",
            "the other", "the previous", "the past",
        ],
        Language::Portuguese => &[
            "o passado", "a passada", "os passados", "as passadas",
            "o último", "a última", "os últimos", "as últimas",
            "o anterior", "a anterior", "o outro", "a outra",
            "no passado", "há", "faz", "já",
        ],
    }
}

/// Future modifiers checked immediately AFTER the date expression.
pub fn future_modifiers_after(language: Language) -> &'static [&'static str] {
    match language {
        Language::Spanish => &[
            "que viene", "que entra", "que sigue",
            "próximo", "próxima", "próximos", "próximas",
            "siguiente", "siguientes", "entrante", "entrantes",
        ],
        Language::English => &[
            "next", "coming", "upcoming", "following",
            "from now", "later", "ahead",
        ],
        Language::Portuguese => &[
            "que vem", "que entra",
            "próximo", "próxima", "próximos", "próximas",
            "seguinte", "seguintes",
        ],
    }
}

/// Future modifiers checked immediately BEFORE the date expression.
pub fn future_modifiers_before(language: Language) -> &'static [&'static str] {
    match language {
        Language::Spanish => &[
            "el próximo", "la próxima", "los próximos", "las próximas",
            "el siguiente", "la siguiente", "el entrante", "la entrante",
            "este", "esta", "estos", "estas",
            "dentro de", "en", "para",
            "el que viene", "la que viene",
        ],
        Language::English => &[
            "next", "this", "the next", "the coming", "the upcoming", "the following",
            "in", "in a", "in an", "in the",
            "within", "within a", "within the",
            "by", "by the", "by next",
            "for", "for the", "for next",
        ],
        Language::Portuguese => &[
            "o próximo", "a próxima", "os próximos", "as próximas",
            "o seguinte", "a seguinte",
            "este", "esta", "estes", "estas",
            "esse", "essa", "neste", "nesta",
            "dentro de", "daqui a", "em", "para", "até",
            "o que vem", "a que vem", "na próxima", "no próximo",
        ],
    }
}

/// Tensed verb forms indicating a completed action.
pub fn past_tense_verbs(language: Language) -> &'static [&'static str] {
    match language {
        Language::Spanish => &[
            // Preterite, irregular
            "fui", "fue", "fueron", "fuimos", "fuiste",
            "estuve", "estuvo", "estuvieron", "estuvimos",
            "hice", "hizo", "hicieron", "hicimos",
            "tuve", "tuvo", "tuvieron", "tuvimos",
            "pude", "pudo", "pudieron", "pudimos",
            "dije", "dijo", "dijeron", "dijimos",
            "vine", "vino", "vinieron", "vinimos",
            "di", "dio", "dieron", "dimos",
            "vi", "vio", "vieron", "vimos",
            // Preterite, common regular
            "pagué", "pagó", "pagaron", "pagamos",
            "llamé", "llamó", "llamaron", "llamamos",
            "hablé", "habló", "hablaron", "hablamos",
            "compré", "compró", "compraron", "compramos",
            "llegué", "llegó", "llegaron", "llegamos",
            "pasé", "pasó", "pasaron",
            "mandé", "mandó", "mandaron",
            "dejé", "dejó", "dejaron",
            "terminé", "terminó", "terminaron",
            "envié", "envió", "enviaron",
            "salí", "salió", "salieron",
            "recibí", "recibió", "recibieron",
            "abrí", "abrió", "abrieron",
            "pedí", "pidió", "pidieron",
            "comí", "comió", "comieron",
            // Imperfect
            "era", "eras", "éramos", "eran",
            "iba", "ibas", "íbamos", "iban",
            "estaba", "estabas", "estábamos", "estaban",
            "había", "habías", "habíamos", "habían",
            "tenía", "tenías", "teníamos", "tenían",
            "quería", "querías", "queríamos", "querían",
            "pagaba", "pagabas", "pagaban",
            "trabajaba", "trabajaban",
            // Compound past
            "he ido", "ha ido", "hemos ido", "han ido",
            "he estado", "ha estado", "han estado",
            "he hecho", "ha hecho", "han hecho",
            "he pagado", "ha pagado", "han pagado",
            "he llamado", "ha llamado", "han llamado",
            "había ido", "había estado", "había hecho", "había pagado",
        ],
        Language::English => &[
            // Irregular past
            "went", "was", "were", "did", "had", "got", "came", "made",
            "said", "told", "gave", "took", "saw", "knew", "thought",
            "found", "left", "felt", "became", "brought", "began",
            "kept", "held", "wrote", "heard", "meant", "met", "ran",
            "paid", "sat", "spoke", "read", "lost", "fell", "sent", "spent",
            "bought", "caught", "taught", "forgot", "chose", "broke", "drove", "ate",
            // Regular past
            "called", "talked", "walked", "worked", "played", "wanted",
            "needed", "started", "finished", "happened", "arrived",
            "passed", "asked", "answered", "helped", "stopped", "tried",
            "used", "moved", "missed", "waited", "watched", "opened",
            "closed", "turned", "changed", "showed", "reached", "returned",
            "remembered", "received", "decided", "visited", "ordered",
            "delivered", "scheduled", "attended", "completed", "submitted",
            // Continuous and perfect
            "was going", "were going", "was working", "were working",
            "have been", "has been", "have gone", "has gone",
            "have done", "has done", "have paid", "has paid",
            "have called", "has called", "had been", "had gone",
            // Completed-action markers
            "already", "just", "recently", "earlier",
        ],
        Language::Portuguese => &[
            // Pretérito perfeito, irregular
            "fui", "foi", "foram", "fomos",
            "estive", "esteve", "estiveram", "estivemos",
            "fiz", "fez", "fizeram", "fizemos",
            "tive", "teve", "tiveram", "tivemos",
            "pude", "pôde", "puderam",
            "disse", "disseram", "dissemos",
            "vim", "veio", "vieram",
            "dei", "deu", "deram",
            "vi", "viu", "viram",
            // Pretérito perfeito, common regular
            "paguei", "pagou", "pagaram", "pagamos",
            "liguei", "ligou", "ligaram",
            "falei", "falou", "falaram",
            "comprei", "comprou", "compraram",
            "cheguei", "chegou", "chegaram",
            "passei", "passou", "passaram",
            "mandei", "mandou", "mandaram",
            "deixei", "deixou", "deixaram",
            "terminei", "terminou", "terminaram",
            "enviei", "enviou", "enviaram",
            "voltei", "voltou", "voltaram",
            "recebi", "recebeu", "receberam",
            "saí", "saiu", "saíram",
            "comi", "comeu", "comeram",
            // Imperfect
            "era", "eram", "ia", "iam",
            "estava", "estavam", "tinha", "tinham",
            "havia", "haviam", "queria", "queriam",
            "pagava", "pagavam", "trabalhava", "trabalhavam",
            // Compound past
            "tenho ido", "tem ido", "temos ido",
            "tenho pago", "tem pago",
            "tenho ligado", "tem ligado",
            "tinha ido", "tinha feito", "tinha pago",
            "havia ido", "havia feito",
        ],
    }
}

/// Verb forms indicating a planned or future action (including the
/// present-for-future usage common in all three languages).
pub fn future_tense_verbs(language: Language) -> &'static [&'static str] {
    match language {
        Language::Spanish => &[
            // Present used for near future
            "voy", "vas", "va", "vamos", "van",
            "tengo", "tienes", "tiene", "tenemos", "tienen",
            "puedo", "puedes", "puede", "podemos", "pueden",
            "quiero", "quieres", "quiere", "queremos", "quieren",
            "necesito", "necesitas", "necesita", "necesitamos",
            "debo", "debes", "debe", "debemos",
            "espero", "espera", "esperamos",
            "pienso", "piensa", "pensamos",
            "pago", "pagas", "paga", "pagamos", "pagan",
            "llamo", "llama", "llamamos",
            "salgo", "sale", "salimos",
            "llego", "llega", "llegamos",
            "empiezo", "empieza", "empezamos",
            "termino", "termina", "terminamos",
            // Simple future
            "iré", "irá", "iremos", "irán",
            "seré", "será", "seremos", "serán",
            "estaré", "estará", "estaremos", "estarán",
            "tendré", "tendrá", "tendremos", "tendrán",
            "haré", "hará", "haremos", "harán",
            "podré", "podrá", "podremos", "podrán",
            "vendré", "vendrá", "vendremos",
            "saldré", "saldrá", "saldremos",
            "pagaré", "pagará", "pagaremos", "pagarán",
            "llamaré", "llamará", "llamaremos",
            "llegaré", "llegará", "llegaremos",
            "empezaré", "empezará",
            "terminaré", "terminará",
            "compraré", "comprará",
            // Periphrastic future
            "voy a", "vas a", "va a", "vamos a", "van a",
            // Conditional as polite future
            "iría", "sería", "estaría", "tendría", "haría",
            "podría", "debería", "pagaría", "llamaría",
            "me gustaría", "quisiera",
        ],
        Language::English => &[
            // Will future
            "will", "will be", "will go", "will do", "will make",
            "will have", "will see", "will get", "will come", "will take",
            "will pay", "will call", "will work", "will start",
            "will finish", "will arrive", "will leave", "will return",
            "will meet", "will visit", "will attend",
            // Going-to future
            "going to", "am going to", "is going to", "are going to",
            "gonna", "am gonna", "is gonna", "are gonna",
            // Present continuous for future
            "am going", "is going", "are going",
            "am coming", "is coming", "are coming",
            "am leaving", "is leaving", "are leaving",
            "am meeting", "is meeting", "are meeting",
            "am starting", "is starting", "are starting",
            // Modals and intent
            "shall", "should", "would", "could", "might", "may",
            "can", "must", "need to", "have to", "has to",
            "plan to", "plans to", "planning to",
            "intend to", "expect to", "hope to",
            "want to", "wants to", "about to", "scheduled to",
            // Time markers
            "tomorrow", "soon", "later", "next",
        ],
        Language::Portuguese => &[
            // Present used for near future
            "vou", "vais", "vai", "vamos", "vão",
            "tenho", "tens", "tem", "temos", "têm",
            "posso", "pode", "podemos", "podem",
            "quero", "quer", "queremos", "querem",
            "preciso", "precisa", "precisamos",
            "devo", "deve", "devemos",
            "espero", "espera", "esperamos",
            "penso", "pensa", "pensamos",
            "pago", "paga", "pagamos", "pagam",
            "ligo", "liga", "ligamos",
            "saio", "sai", "saímos",
            "chego", "chega", "chegamos",
            "começo", "começa", "começamos",
            "termino", "termina", "terminamos",
            // Simple future
            "irei", "irá", "iremos", "irão",
            "serei", "será", "seremos", "serão",
            "estarei", "estará", "estaremos",
            "terei", "terá", "teremos",
            "farei", "fará", "faremos",
            "poderei", "poderá", "poderemos",
            "pagarei", "pagará", "pagaremos",
            "ligarei", "ligará", "ligaremos",
            "chegarei", "chegará",
            "começarei", "começará",
            "terminarei", "terminará",
            "voltarei", "voltará",
            // Conditional as polite future
            "iria", "seria", "estaria", "teria", "faria",
            "poderia", "deveria", "pagaria", "ligaria",
            "gostaria", "precisaria", "queria",
            // Time markers
            "amanhã", "logo", "em breve",
        ],
    }
}

/// Weekday names, each paired with its chrono weekday.
pub fn weekdays(language: Language) -> &'static [(&'static str, Weekday)] {
    match language {
        Language::Spanish => &[
            ("lunes", Weekday::Mon),
            ("martes", Weekday::Tue),
            ("miércoles", Weekday::Wed),
            ("miercoles", Weekday::Wed),
            ("jueves", Weekday::Thu),
            ("viernes", Weekday::Fri),
            ("sábado", Weekday::Sat),
            ("sabado", Weekday::Sat),
            ("domingo", Weekday::Sun),
        ],
        Language::English => &[
            ("monday", Weekday::Mon),
            ("tuesday", Weekday::Tue),
            ("wednesday", Weekday::Wed),
            ("thursday", Weekday::Thu),
            ("friday", Weekday::Fri),
            ("saturday", Weekday::Sat),
            ("sunday", Weekday::Sun),
        ],
        Language::Portuguese => &[
            ("segunda-feira", Weekday::Mon),
            ("segunda", Weekday::Mon),
            ("terça-feira", Weekday::Tue),
            ("terça", Weekday::Tue),
            ("quarta-feira", Weekday::Wed),
            ("quarta", Weekday::Wed),
            ("quinta-feira", Weekday::Thu),
            ("quinta", Weekday::Thu),
            ("sexta-feira", Weekday::Fri),
            ("sexta", Weekday::Fri),
            ("sábado", Weekday::Sat),
            ("domingo", Weekday::Sun),
        ],
    }
}

/// Month names paired with their 1-based number.
pub fn months(language: Language) -> &'static [(&'static str, u32)] {
    match language {
        Language::Spanish => &[
            ("enero", 1), ("febrero", 2), ("marzo", 3), ("abril", 4),
            ("mayo", 5), ("junio", 6), ("julio", 7), ("agosto", 8),
            ("septiembre", 9), ("setiembre", 9), ("octubre", 10),
            ("noviembre", 11), ("diciembre", 12),
        ],
        Language::English => &[
            ("january", 1), ("february", 2), ("march", 3), ("april", 4),
            ("may", 5), ("june", 6), ("july", 7), ("august", 8),
            ("september", 9), ("october", 10), ("november", 11), ("december", 12),
        ],
        Language::Portuguese => &[
            ("janeiro", 1), ("fevereiro", 2), ("março", 3), ("abril", 4),
            ("maio", 5), ("junho", 6), ("julho", 7), ("agosto", 8),
            ("setembro", 9), ("outubro", 10), ("novembro", 11), ("dezembro", 12),
        ],
    }
}

/// Words naming a whole day relative to today, with their offset.
pub fn relative_days(language: Language) -> &'static [(&'static str, i64)] {
    match language {
        Language::Spanish => &[
            ("pasado mañana", 2),
            ("anteayer", -2),
            ("mañana", 1),
            ("ayer", -1),
            ("hoy", 0),
        ],
        Language::English => &[
            ("day after tomorrow", 2),
            ("day before yesterday", -2),
            ("tomorrow", 1),
            ("yesterday", -1),
            ("today", 0),
        ],
        Language::Portuguese => &[
            ("depois de amanhã", 2),
            ("anteontem", -2),
            ("amanhã", 1),
            ("ontem", -1),
            ("hoje", 0),
        ],
    }
}

/// Small quantity words accepted in relative offsets ("dos semanas").
pub fn quantity_words(language: Language) -> &'static [(&'static str, i64)] {
    match language {
        Language::Spanish => &[
            ("un", 1), ("una", 1), ("dos", 2), ("tres", 3), ("cuatro", 4),
            ("cinco", 5), ("seis", 6), ("siete", 7), ("ocho", 8),
            ("nueve", 9), ("diez", 10), ("quince", 15),
        ],
        Language::English => &[
            ("a", 1), ("an", 1), ("one", 1), ("two", 2), ("three", 3),
            ("four", 4), ("five", 5), ("six", 6), ("seven", 7),
            ("eight", 8), ("nine", 9), ("ten", 10),
        ],
        Language::Portuguese => &[
            ("um", 1), ("uma", 1), ("dois", 2), ("duas", 2), ("três", 3),
            ("quatro", 4), ("cinco", 5), ("seis", 6), ("sete", 7),
            ("oito", 8), ("nove", 9), ("dez", 10), ("quinze", 15),
        ],
    }
}

/// Calendar units accepted in relative offsets, with their length unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarUnit {
    Day,
    Week,
    Month,
    Year,
}

pub fn calendar_units(language: Language) -> &'static [(&'static str, CalendarUnit)] {
    match language {
        Language::Spanish => &[
            ("días", CalendarUnit::Day), ("día", CalendarUnit::Day),
            ("dias", CalendarUnit::Day), ("dia", CalendarUnit::Day),
            ("semanas", CalendarUnit::Week), ("semana", CalendarUnit::Week),
            ("meses", CalendarUnit::Month), ("mes", CalendarUnit::Month),
            ("años", CalendarUnit::Year), ("año", CalendarUnit::Year),
        ],
        Language::English => &[
            ("days", CalendarUnit::Day), ("day", CalendarUnit::Day),
            ("weeks", CalendarUnit::Week), ("week", CalendarUnit::Week),
            ("months", CalendarUnit::Month), ("month", CalendarUnit::Month),
            ("years", CalendarUnit::Year), ("year", CalendarUnit::Year),
        ],
        Language::Portuguese => &[
            ("dias", CalendarUnit::Day), ("dia", CalendarUnit::Day),
            ("semanas", CalendarUnit::Week), ("semana", CalendarUnit::Week),
            ("meses", CalendarUnit::Month), ("mês", CalendarUnit::Month),
            ("anos", CalendarUnit::Year), ("ano", CalendarUnit::Year),
        ],
    }
}
